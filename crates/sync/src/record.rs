use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use exemptd_core::CustomerId;

/// Tag the remote service uses for customers without an exemption.
const NON_EXEMPT: &str = "non_exempt";

/// Project the local status tag into the remote vocabulary: the remote
/// record has no notion of an empty tag.
#[must_use]
pub fn project_tag(tag: &str) -> &str {
    if tag.is_empty() { NON_EXEMPT } else { tag }
}

/// The remote tax service's view of one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub exemption_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
}

impl CustomerRecord {
    /// Build the record the local side believes should exist remotely.
    #[must_use]
    pub fn from_local(customer: CustomerId, tag: &str, name: &str) -> Self {
        Self {
            customer_id: customer.to_string(),
            exemption_type: project_tag(tag).to_owned(),
            name: name.to_owned(),
            country: String::new(),
            state: String::new(),
        }
    }

    /// The desired remote record: local exemption tag, remote-owned
    /// identity fields preserved where the remote already has them.
    #[must_use]
    pub fn merged_onto(&self, remote: &Self) -> Self {
        Self {
            customer_id: self.customer_id.clone(),
            exemption_type: self.exemption_type.clone(),
            name: if self.name.is_empty() {
                remote.name.clone()
            } else {
                self.name.clone()
            },
            country: remote.country.clone(),
            state: remote.state.clone(),
        }
    }

    /// Sorted-key projection used for drift comparison. Key order is
    /// deterministic so two projections are equal iff every field agrees.
    #[must_use]
    pub fn projection(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("country", self.country.as_str()),
            ("customer_id", self.customer_id.as_str()),
            ("exemption_type", self.exemption_type.as_str()),
            ("name", self.name.as_str()),
            ("state", self.state.as_str()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_projects_as_non_exempt() {
        assert_eq!(project_tag(""), "non_exempt");
        assert_eq!(project_tag("wholesale"), "wholesale");
    }

    #[test]
    fn identical_records_have_equal_projections() {
        let local = CustomerRecord::from_local(CustomerId::new(5), "wholesale", "Acme Co");
        let remote = CustomerRecord {
            customer_id: "5".into(),
            exemption_type: "wholesale".into(),
            name: "Acme Co".into(),
            country: String::new(),
            state: String::new(),
        };
        assert_eq!(local.projection(), remote.projection());
    }

    #[test]
    fn drifted_tag_changes_projection() {
        let local = CustomerRecord::from_local(CustomerId::new(5), "", "Acme Co");
        let remote = CustomerRecord {
            customer_id: "5".into(),
            exemption_type: "wholesale".into(),
            name: "Acme Co".into(),
            country: String::new(),
            state: String::new(),
        };
        assert_ne!(local.projection(), remote.projection());
        assert_eq!(local.exemption_type, "non_exempt");
    }

    #[test]
    fn merge_keeps_remote_identity_fields() {
        let local = CustomerRecord::from_local(CustomerId::new(5), "government", "");
        let remote = CustomerRecord {
            customer_id: "5".into(),
            exemption_type: "wholesale".into(),
            name: "Acme Co".into(),
            country: "US".into(),
            state: "UT".into(),
        };
        let merged = local.merged_onto(&remote);
        assert_eq!(merged.exemption_type, "government");
        assert_eq!(merged.name, "Acme Co");
        assert_eq!(merged.country, "US");
        assert_eq!(merged.state, "UT");
    }
}

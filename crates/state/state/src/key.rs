use serde::{Deserialize, Serialize};

use exemptd_core::CustomerId;

/// The kind of attribute being stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// The uploaded certificate record (JSON).
    Certificate,
    /// The 501(c)(3) nonprofit flag.
    Nonprofit501c3,
    /// Certificate expiration timestamp.
    Expiration,
    /// Derived exemption category tag (empty = not exempt).
    ExemptionType,
    /// Expiration timestamp an expiring-soon alert was last sent for.
    AlertedExpiration,
    Custom(String),
}

impl AttrKind {
    /// Return a string representation of the attribute kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Certificate => "certificate",
            Self::Nonprofit501c3 => "501c3",
            Self::Expiration => "expiration",
            Self::ExemptionType => "exemption_type",
            Self::AlertedExpiration => "alerted_expiration",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for AttrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key addressing one attribute of one customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttrKey {
    pub customer: CustomerId,
    pub kind: AttrKind,
}

impl AttrKey {
    /// Create a new attribute key.
    #[must_use]
    pub fn new(customer: impl Into<CustomerId>, kind: AttrKind) -> Self {
        Self {
            customer: customer.into(),
            kind,
        }
    }

    /// Return a canonical string representation: `customer:{id}:{kind}`
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("customer:{}:{}", self.customer, self.kind)
    }
}

impl std::fmt::Display for AttrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a customer record in the host commerce system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(u64);

impl CustomerId {
    /// Create a new customer id from a numeric value.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the inner numeric value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CustomerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The role tag granted to exempt customers on their account.
pub const EXEMPT_ROLE: &str = "tax_exempt";

/// The exemption category tags recognized as "exempt".
///
/// An empty status tag means "not exempt"; any of these non-empty tags
/// means "exempt under this category".
pub const EXEMPT_CATEGORIES: [&str; 3] = ["wholesale", "government", "other"];

/// Returns `true` if `tag` is one of the recognized exemption categories.
#[must_use]
pub fn is_exempt_category(tag: &str) -> bool {
    EXEMPT_CATEGORIES.contains(&tag)
}

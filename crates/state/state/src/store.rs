use async_trait::async_trait;

use exemptd_core::CustomerId;

use crate::error::StateError;
use crate::key::{AttrKey, AttrKind};

/// Trait for persisting customer attributes.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Values are opaque strings; callers serialize structured attributes as
/// JSON before storing them.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Get the value for a key. Returns `None` if the attribute is unset.
    async fn get(&self, key: &AttrKey) -> Result<Option<String>, StateError>;

    /// Set a value, overwriting any previous value.
    async fn set(&self, key: &AttrKey, value: &str) -> Result<(), StateError>;

    /// Delete a key. Returns `true` if the attribute existed.
    async fn delete(&self, key: &AttrKey) -> Result<bool, StateError>;

    /// Scan all customers that have a value for the given kind.
    ///
    /// Returns `(customer, value)` pairs. This walks the whole keyspace for
    /// the kind; the expiration scanner is its only caller and runs once a
    /// day, so backends may implement it as a plain filter.
    async fn scan_kind(&self, kind: AttrKind) -> Result<Vec<(CustomerId, String)>, StateError>;
}

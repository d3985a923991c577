use async_trait::async_trait;
use dashmap::DashMap;

use exemptd_core::CustomerId;
use exemptd_state::error::StateError;
use exemptd_state::key::{AttrKey, AttrKind};
use exemptd_state::store::AttributeStore;

/// In-memory [`AttributeStore`] backed by a [`DashMap`].
///
/// Customer attributes have no TTL; entries live until deleted. This
/// implementation is fully synchronous internally; the async trait methods
/// return immediately.
#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    data: DashMap<(CustomerId, String), String>,
}

impl MemoryAttributeStore {
    /// Create a new, empty in-memory attribute store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn render_key(key: &AttrKey) -> (CustomerId, String) {
        (key.customer, key.kind.as_str().to_owned())
    }
}

#[async_trait]
impl AttributeStore for MemoryAttributeStore {
    async fn get(&self, key: &AttrKey) -> Result<Option<String>, StateError> {
        let rendered = Self::render_key(key);
        Ok(self.data.get(&rendered).map(|entry| entry.clone()))
    }

    async fn set(&self, key: &AttrKey, value: &str) -> Result<(), StateError> {
        let rendered = Self::render_key(key);
        self.data.insert(rendered, value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &AttrKey) -> Result<bool, StateError> {
        let rendered = Self::render_key(key);
        Ok(self.data.remove(&rendered).is_some())
    }

    async fn scan_kind(&self, kind: AttrKind) -> Result<Vec<(CustomerId, String)>, StateError> {
        let kind = kind.as_str().to_owned();
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().1 == kind)
            .map(|entry| (entry.key().0, entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exemptd_state::testing::run_store_conformance_tests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryAttributeStore::new();
        run_store_conformance_tests(&store)
            .await
            .expect("memory store should pass conformance tests");
    }

    #[tokio::test]
    async fn scan_kind_is_empty_for_unused_kind() {
        let store = MemoryAttributeStore::new();
        store
            .set(&AttrKey::new(1u64, AttrKind::Expiration), "10")
            .await
            .unwrap();
        let entries = store.scan_kind(AttrKind::Certificate).await.unwrap();
        assert!(entries.is_empty());
    }
}

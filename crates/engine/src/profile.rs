use std::sync::Arc;

use exemptd_core::{CertificateRecord, CustomerId, ExemptionFacts};
use exemptd_state::{AttrKey, AttrKind, AttributeStore};

use crate::error::EngineError;

/// Typed accessors over the raw attribute store.
///
/// Structured attributes (the certificate record) are stored as JSON;
/// scalars are stored in their canonical string form. Missing attributes
/// read as their safe defaults: no certificate, not 501c3, no expiration,
/// empty exemption tag.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn AttributeStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    /// The underlying attribute store.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn AttributeStore> {
        &self.store
    }

    fn key(customer: CustomerId, kind: AttrKind) -> AttrKey {
        AttrKey::new(customer, kind)
    }

    pub async fn certificate(
        &self,
        customer: CustomerId,
    ) -> Result<Option<CertificateRecord>, EngineError> {
        let key = Self::key(customer, AttrKind::Certificate);
        match self.store.get(&key).await? {
            Some(raw) => {
                let record = serde_json::from_str(&raw).map_err(|e| {
                    EngineError::CorruptAttribute {
                        key: key.canonical(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn set_certificate(
        &self,
        customer: CustomerId,
        record: &CertificateRecord,
    ) -> Result<(), EngineError> {
        let key = Self::key(customer, AttrKind::Certificate);
        let raw = serde_json::to_string(record).map_err(|e| EngineError::CorruptAttribute {
            key: key.canonical(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &raw).await?;
        Ok(())
    }

    /// Null the stored certificate record. The underlying file is kept.
    pub async fn clear_certificate(&self, customer: CustomerId) -> Result<bool, EngineError> {
        Ok(self
            .store
            .delete(&Self::key(customer, AttrKind::Certificate))
            .await?)
    }

    pub async fn is_501c3(&self, customer: CustomerId) -> Result<bool, EngineError> {
        let raw = self
            .store
            .get(&Self::key(customer, AttrKind::Nonprofit501c3))
            .await?;
        Ok(raw.as_deref() == Some("true"))
    }

    pub async fn set_501c3(&self, customer: CustomerId, value: bool) -> Result<(), EngineError> {
        self.store
            .set(
                &Self::key(customer, AttrKind::Nonprofit501c3),
                if value { "true" } else { "false" },
            )
            .await?;
        Ok(())
    }

    pub async fn expiration(&self, customer: CustomerId) -> Result<Option<i64>, EngineError> {
        self.read_timestamp(customer, AttrKind::Expiration).await
    }

    pub async fn set_expiration(
        &self,
        customer: CustomerId,
        expiration: Option<i64>,
    ) -> Result<(), EngineError> {
        let key = Self::key(customer, AttrKind::Expiration);
        match expiration {
            Some(ts) => self.store.set(&key, &ts.to_string()).await?,
            None => {
                self.store.delete(&key).await?;
            }
        }
        Ok(())
    }

    /// The derived exemption category tag; empty means not exempt.
    pub async fn exemption_type(&self, customer: CustomerId) -> Result<String, EngineError> {
        Ok(self
            .store
            .get(&Self::key(customer, AttrKind::ExemptionType))
            .await?
            .unwrap_or_default())
    }

    pub async fn set_exemption_type(
        &self,
        customer: CustomerId,
        tag: &str,
    ) -> Result<(), EngineError> {
        self.store
            .set(&Self::key(customer, AttrKind::ExemptionType), tag)
            .await?;
        Ok(())
    }

    pub async fn alerted_expiration(
        &self,
        customer: CustomerId,
    ) -> Result<Option<i64>, EngineError> {
        self.read_timestamp(customer, AttrKind::AlertedExpiration)
            .await
    }

    pub async fn set_alerted_expiration(
        &self,
        customer: CustomerId,
        expiration: i64,
    ) -> Result<(), EngineError> {
        self.store
            .set(
                &Self::key(customer, AttrKind::AlertedExpiration),
                &expiration.to_string(),
            )
            .await?;
        Ok(())
    }

    pub async fn clear_alerted_expiration(&self, customer: CustomerId) -> Result<(), EngineError> {
        self.store
            .delete(&Self::key(customer, AttrKind::AlertedExpiration))
            .await?;
        Ok(())
    }

    /// The full facts tuple as currently stored.
    pub async fn facts(&self, customer: CustomerId) -> Result<ExemptionFacts, EngineError> {
        Ok(ExemptionFacts {
            certificate: self.certificate(customer).await?,
            is_501c3: self.is_501c3(customer).await?,
            expiration: self.expiration(customer).await?,
        })
    }

    async fn read_timestamp(
        &self,
        customer: CustomerId,
        kind: AttrKind,
    ) -> Result<Option<i64>, EngineError> {
        let key = Self::key(customer, kind);
        match self.store.get(&key).await? {
            Some(raw) => {
                let ts = raw.parse::<i64>().map_err(|e| EngineError::CorruptAttribute {
                    key: key.canonical(),
                    reason: e.to_string(),
                })?;
                Ok(Some(ts))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exemptd_state_memory::MemoryAttributeStore;

    fn profile() -> ProfileStore {
        ProfileStore::new(Arc::new(MemoryAttributeStore::new()))
    }

    #[tokio::test]
    async fn certificate_round_trip() {
        let profile = profile();
        let customer = CustomerId::new(1);
        assert!(profile.certificate(customer).await.unwrap().is_none());

        let record =
            CertificateRecord::new("/certs/1/a.pdf", "https://x/a.pdf", "a.pdf", "application/pdf");
        profile.set_certificate(customer, &record).await.unwrap();
        assert_eq!(profile.certificate(customer).await.unwrap(), Some(record));

        assert!(profile.clear_certificate(customer).await.unwrap());
        assert!(profile.certificate(customer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_attributes_read_as_defaults() {
        let profile = profile();
        let customer = CustomerId::new(2);
        let facts = profile.facts(customer).await.unwrap();
        assert_eq!(facts, ExemptionFacts::default());
        assert_eq!(profile.exemption_type(customer).await.unwrap(), "");
        assert!(profile.alerted_expiration(customer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expiration_set_and_clear() {
        let profile = profile();
        let customer = CustomerId::new(3);
        profile.set_expiration(customer, Some(1_700_000_000)).await.unwrap();
        assert_eq!(profile.expiration(customer).await.unwrap(), Some(1_700_000_000));
        profile.set_expiration(customer, None).await.unwrap();
        assert_eq!(profile.expiration(customer).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_certificate_surfaces_key() {
        let profile = profile();
        let customer = CustomerId::new(4);
        profile
            .raw()
            .set(&AttrKey::new(4u64, AttrKind::Certificate), "not-json")
            .await
            .unwrap();

        let err = profile.certificate(customer).await.unwrap_err();
        match err {
            EngineError::CorruptAttribute { key, .. } => {
                assert_eq!(key, "customer:4:certificate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

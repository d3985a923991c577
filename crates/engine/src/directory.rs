use async_trait::async_trait;
use dashmap::DashMap;

use exemptd_core::{CustomerContact, CustomerId};

use crate::error::EngineError;

/// Resolves customer contact details for outgoing notifications.
///
/// Backed by whatever identity system owns the customer accounts; the
/// engine only needs the contact fields carried on expiring-soon events.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Contact details for `customer`, or `None` if the account is unknown.
    async fn contact(&self, customer: CustomerId) -> Result<Option<CustomerContact>, EngineError>;
}

/// In-memory directory for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCustomerDirectory {
    contacts: DashMap<CustomerId, CustomerContact>,
}

impl MemoryCustomerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, customer: CustomerId, contact: CustomerContact) {
        self.contacts.insert(customer, contact);
    }
}

#[async_trait]
impl CustomerDirectory for MemoryCustomerDirectory {
    async fn contact(&self, customer: CustomerId) -> Result<Option<CustomerContact>, EngineError> {
        Ok(self.contacts.get(&customer).map(|c| c.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_returns_inserted_contact() {
        let directory = MemoryCustomerDirectory::new();
        let customer = CustomerId::new(11);
        directory.insert(
            customer,
            CustomerContact {
                email: "amy@example.com".into(),
                first_name: "Amy".into(),
                last_name: "Pond".into(),
            },
        );

        let found = directory.contact(customer).await.unwrap().unwrap();
        assert_eq!(found.email, "amy@example.com");
        assert!(directory.contact(CustomerId::new(12)).await.unwrap().is_none());
    }
}

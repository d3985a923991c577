use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use tracing::debug;

use exemptd_core::CustomerId;

use crate::error::SyncError;
use crate::record::CustomerRecord;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The remote tax service's customer record endpoints.
#[async_trait]
pub trait CustomerRecordApi: Send + Sync {
    /// Fetch the record, or `None` if the remote has never seen this
    /// customer.
    async fn fetch(&self, customer: CustomerId) -> Result<Option<CustomerRecord>, SyncError>;

    async fn create(&self, record: &CustomerRecord) -> Result<(), SyncError>;

    async fn update(&self, record: &CustomerRecord) -> Result<(), SyncError>;
}

/// REST client for the remote customer record API.
///
/// `GET/POST/PUT {base_url}/customers[/{id}]`, bearer-authenticated,
/// bounded 10s timeout. A 404 on fetch maps to `None` rather than an
/// error; every other non-success status is surfaced as [`SyncError::Api`].
pub struct RestCustomerRecordApi {
    client: Client,
    base_url: String,
    api_token: String,
}

impl RestCustomerRecordApi {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    /// Use a custom client, e.g. to share a connection pool.
    pub fn with_client(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    fn customer_url(&self, id: &str) -> String {
        format!("{}/customers/{id}", self.base_url.trim_end_matches('/'))
    }

    async fn check(response: reqwest::Response) -> Result<(), SyncError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl CustomerRecordApi for RestCustomerRecordApi {
    async fn fetch(&self, customer: CustomerId) -> Result<Option<CustomerRecord>, SyncError> {
        let url = self.customer_url(&customer.to_string());
        debug!(%customer, "fetching remote customer record");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let record = response
            .json::<CustomerRecord>()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))?;
        Ok(Some(record))
    }

    async fn create(&self, record: &CustomerRecord) -> Result<(), SyncError> {
        let url = format!("{}/customers", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(record)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn update(&self, record: &CustomerRecord) -> Result<(), SyncError> {
        let url = self.customer_url(&record.customer_id);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(record)
            .send()
            .await?;
        Self::check(response).await
    }
}

/// In-memory record API for tests and offline runs. Counts write calls so
/// callers can assert on idempotence.
#[derive(Default)]
pub struct MemoryCustomerRecordApi {
    records: DashMap<String, CustomerRecord>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    /// When set, every call fails with this message.
    pub fail_with: Option<String>,
}

impl MemoryCustomerRecordApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: CustomerRecord) {
        self.records.insert(record.customer_id.clone(), record);
    }

    #[must_use]
    pub fn record(&self, customer_id: &str) -> Option<CustomerRecord> {
        self.records.get(customer_id).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<(), SyncError> {
        match &self.fail_with {
            Some(message) => Err(SyncError::Http(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CustomerRecordApi for MemoryCustomerRecordApi {
    async fn fetch(&self, customer: CustomerId) -> Result<Option<CustomerRecord>, SyncError> {
        self.maybe_fail()?;
        Ok(self.record(&customer.to_string()))
    }

    async fn create(&self, record: &CustomerRecord) -> Result<(), SyncError> {
        self.maybe_fail()?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.records.insert(record.customer_id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &CustomerRecord) -> Result<(), SyncError> {
        self.maybe_fail()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.records.insert(record.customer_id.clone(), record.clone());
        Ok(())
    }
}

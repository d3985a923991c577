use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use exemptd_core::{ChangeEvent, CustomerId};
use exemptd_engine::{ChangeSubscriber, CustomerDirectory, NotifyError};

use crate::api::CustomerRecordApi;
use crate::record::CustomerRecord;

/// Secondary veto over a drift-triggered update.
///
/// The no-drift case never reaches the guard: identical projections skip
/// the write unconditionally. The guard only decides whether a genuine
/// difference is worth pushing right now (rate limiting, maintenance
/// windows).
pub trait SyncGuard: Send + Sync {
    fn should_sync(&self, customer: CustomerId, local: &CustomerRecord, remote: &CustomerRecord)
    -> bool;
}

/// Default guard: every drift is pushed.
pub struct AlwaysSync;

impl SyncGuard for AlwaysSync {
    fn should_sync(&self, _: CustomerId, _: &CustomerRecord, _: &CustomerRecord) -> bool {
        true
    }
}

/// Reconciles exemption status changes into the remote customer record.
///
/// Subscribed to status-updated events only; the other fact kinds have no
/// remote counterpart. Local state is never rolled back on failure.
pub struct RecordSync {
    api: Arc<dyn CustomerRecordApi>,
    directory: Arc<dyn CustomerDirectory>,
    guard: Arc<dyn SyncGuard>,
}

impl RecordSync {
    pub fn new(api: Arc<dyn CustomerRecordApi>, directory: Arc<dyn CustomerDirectory>) -> Self {
        Self {
            api,
            directory,
            guard: Arc::new(AlwaysSync),
        }
    }

    #[must_use]
    pub fn with_guard(mut self, guard: Arc<dyn SyncGuard>) -> Self {
        self.guard = guard;
        self
    }

    async fn display_name(&self, customer: CustomerId) -> String {
        match self.directory.contact(customer).await {
            Ok(Some(contact)) => {
                format!("{} {}", contact.first_name, contact.last_name).trim().to_owned()
            }
            Ok(None) | Err(_) => String::new(),
        }
    }

    async fn reconcile(&self, customer: CustomerId, status: &str) -> Result<(), NotifyError> {
        let name = self.display_name(customer).await;
        let local = CustomerRecord::from_local(customer, status, &name);

        let remote = self
            .api
            .fetch(customer)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        match remote {
            None => {
                self.api
                    .create(&local)
                    .await
                    .map_err(|e| NotifyError::Delivery(e.to_string()))?;
                info!(%customer, tag = %local.exemption_type, "remote customer record created");
            }
            Some(remote) => {
                let desired = local.merged_onto(&remote);
                if desired.projection() == remote.projection() {
                    debug!(%customer, "remote record already current, skipping update");
                    return Ok(());
                }
                if !self.guard.should_sync(customer, &desired, &remote) {
                    debug!(%customer, "sync guard vetoed update");
                    return Ok(());
                }
                self.api
                    .update(&desired)
                    .await
                    .map_err(|e| NotifyError::Delivery(e.to_string()))?;
                info!(%customer, tag = %desired.exemption_type, "remote customer record updated");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeSubscriber for RecordSync {
    fn name(&self) -> &str {
        "remote-record-sync"
    }

    #[instrument(skip(self, event), fields(customer = %event.customer()))]
    async fn on_change(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let ChangeEvent::StatusUpdated { customer, status } = event else {
            return Ok(());
        };
        self.reconcile(*customer, status).await
    }
}

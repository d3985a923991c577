use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use exemptd_core::{
    AlertSink, ChangeEvent, CustomerContact, CustomerId, OperatorAlert, Settings,
};
use exemptd_state::AttrKind;

use crate::directory::CustomerDirectory;
use crate::error::EngineError;
use crate::notifier::{ChangeNotifier, ChangeSubscriber, NotifyError};
use crate::profile::ProfileStore;

const SECS_PER_DAY: i64 = 86_400;

/// Periodic sweep for exemptions lapsing within the configured horizon.
///
/// Each matching customer is alerted at most once per stored expiration
/// value; the marker attribute records which expiration was announced.
/// Extending the date clears the marker (see [`AlertMarkerReset`]), so the
/// next lapse gets its own alert.
pub struct ExpirationScanner {
    profile: ProfileStore,
    directory: Arc<dyn CustomerDirectory>,
    notifier: Arc<ChangeNotifier>,
    alerts: Arc<dyn AlertSink>,
    settings: Settings,
}

impl ExpirationScanner {
    pub fn new(
        profile: ProfileStore,
        directory: Arc<dyn CustomerDirectory>,
        notifier: Arc<ChangeNotifier>,
        alerts: Arc<dyn AlertSink>,
        settings: Settings,
    ) -> Self {
        Self {
            profile,
            directory,
            notifier,
            alerts,
            settings,
        }
    }

    /// Run one sweep. Returns how many customers were alerted.
    pub async fn run(&self, now: i64) -> Result<usize, EngineError> {
        let horizon = now + self.settings.expiring_alert_days * SECS_PER_DAY;
        let tagged = self
            .profile
            .raw()
            .scan_kind(AttrKind::ExemptionType)
            .await?;

        let mut alerted = 0;
        for (customer, tag) in tagged {
            if tag.is_empty() {
                continue;
            }
            if self.profile.is_501c3(customer).await? {
                continue;
            }
            // A missing expiration on an exempt customer reads as 0 and is
            // treated as already lapsed.
            let expiration = self.profile.expiration(customer).await?.unwrap_or(0);
            if expiration > horizon {
                continue;
            }
            if self.profile.alerted_expiration(customer).await?.is_some() {
                debug!(%customer, "already alerted for this expiration");
                continue;
            }

            let contact = match self.directory.contact(customer).await? {
                Some(contact) => contact,
                None => {
                    self.alerts.record(OperatorAlert::warning(format!(
                        "No contact details for customer {customer}"
                    )));
                    CustomerContact::default()
                }
            };
            let days_left = (expiration - now).div_euclid(SECS_PER_DAY);
            self.notifier
                .publish(&ChangeEvent::ExpirationApproaching {
                    customer,
                    contact,
                    expiration,
                    days_left,
                })
                .await;
            self.profile.set_alerted_expiration(customer, expiration).await?;
            alerted += 1;
        }

        info!(alerted, "expiring exemption sweep complete");
        Ok(alerted)
    }
}

/// Clears the alerted-expiration marker when a customer's date is extended.
///
/// Only a forward extension into the future resets the marker; backdating
/// an expired record or shuffling dates in the past never re-arms the
/// alert for the same lapse.
pub struct AlertMarkerReset {
    profile: ProfileStore,
}

impl AlertMarkerReset {
    pub fn new(profile: ProfileStore) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ChangeSubscriber for AlertMarkerReset {
    fn name(&self) -> &str {
        "alert-marker-reset"
    }

    async fn on_change(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let ChangeEvent::ExpirationUpdated {
            customer,
            expiration,
            old_expiration,
        } = event
        else {
            return Ok(());
        };
        let Some(new) = *expiration else {
            return Ok(());
        };
        let old = old_expiration.unwrap_or(0);
        let now = chrono::Utc::now().timestamp();
        if new > old && new >= now {
            if let Err(e) = self.profile.clear_alerted_expiration(*customer).await {
                warn!(%customer, error = %e, "failed to reset expiring alert marker");
                return Err(NotifyError::Delivery(e.to_string()));
            }
        }
        Ok(())
    }
}

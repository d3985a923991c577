use std::sync::Arc;

use tracing::{debug, info};

use exemptd_core::{AlertSink, CertificateRecord, CustomerId, Settings};

use crate::error::EngineError;
use crate::profile::ProfileStore;
use crate::roles::{RoleAssigner, RoleContext};
use crate::validity::{ReachabilityProbe, certificate_is_valid, expiration_is_valid};

/// Outcome of one evaluation, from the caller's point of view.
///
/// `Unchanged` means the status tag was already correct; the role was still
/// idempotently re-synced, but no status notification should fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// The tag did not change. Suppress the status notification.
    Unchanged,
    /// Changed to exempt under this category tag.
    Exempt(String),
    /// Changed to not exempt (tag cleared).
    NotExempt,
}

impl StatusChange {
    /// The new tag value, if the status actually changed.
    #[must_use]
    pub fn new_tag(&self) -> Option<&str> {
        match self {
            Self::Unchanged => None,
            Self::Exempt(tag) => Some(tag),
            Self::NotExempt => Some(""),
        }
    }
}

/// Facts supplied by an in-flight form submission.
///
/// A `None` field was not part of the submission and is read from the
/// attribute store instead; `Some(None)` explicitly supplies "absent"
/// (e.g. a certificate deleted in this request).
#[derive(Debug, Clone, Default)]
pub struct FactsOverride {
    pub certificate: Option<Option<CertificateRecord>>,
    pub is_501c3: Option<bool>,
    pub expiration: Option<Option<i64>>,
}

/// What an evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub change: StatusChange,
    /// An invalid stored certificate record was cleared (file kept).
    /// The caller owes downstream systems a certificate-updated event.
    pub certificate_cleared: bool,
}

impl Evaluation {
    fn unchanged() -> Self {
        Self {
            change: StatusChange::Unchanged,
            certificate_cleared: false,
        }
    }
}

/// The exemption state machine.
///
/// `should_be_exempt = certificate_valid AND (is_501c3 OR expiration_valid)`:
/// the 501(c)(3) flag bypasses only the expiration check, never the
/// certificate check. When no default category is configured the evaluator
/// is a global no-op, letting operators curate status tags manually.
pub struct Evaluator {
    profile: ProfileStore,
    roles: Arc<RoleAssigner>,
    probe: Arc<dyn ReachabilityProbe>,
    alerts: Arc<dyn AlertSink>,
    settings: Settings,
}

impl Evaluator {
    pub fn new(
        profile: ProfileStore,
        roles: Arc<RoleAssigner>,
        probe: Arc<dyn ReachabilityProbe>,
        alerts: Arc<dyn AlertSink>,
        settings: Settings,
    ) -> Self {
        Self {
            profile,
            roles,
            probe,
            alerts,
            settings,
        }
    }

    /// Derive the exemption state for `customer` and reconcile tag and role.
    ///
    /// Inputs present in `overrides` are taken from the in-flight request;
    /// everything else is read from the store. Safe to re-run: a second
    /// evaluation with unchanged inputs returns `Unchanged` and only
    /// re-syncs the role.
    pub async fn evaluate(
        &self,
        customer: CustomerId,
        overrides: FactsOverride,
        ctx: &mut RoleContext,
        now: i64,
    ) -> Result<Evaluation, EngineError> {
        // Auto-assignment disabled: no writes, no notifications.
        if !self.settings.auto_assign_active() {
            debug!(%customer, "auto-assignment disabled, skipping evaluation");
            return Ok(Evaluation::unchanged());
        }

        let certificate = match overrides.certificate {
            Some(value) => value,
            None => self.profile.certificate(customer).await?,
        };
        let is_501c3 = match overrides.is_501c3 {
            Some(value) => value,
            None => self.profile.is_501c3(customer).await?,
        };
        let expiration = match overrides.expiration {
            Some(value) => value,
            None => self.profile.expiration(customer).await?,
        };

        let cert_valid =
            certificate_is_valid(certificate.as_ref(), self.probe.as_ref(), self.alerts.as_ref())
                .await;

        // Clear stale bad data so the same failure does not re-trigger on
        // the next read. The underlying file stays on disk.
        let mut certificate_cleared = false;
        if !cert_valid {
            certificate_cleared = self.profile.clear_certificate(customer).await?;
        }

        let exp_valid = expiration_is_valid(expiration, is_501c3, now, self.alerts.as_ref());
        let should_be_exempt = cert_valid && exp_valid;

        let old_status = self.profile.exemption_type(customer).await?;
        let new_status = if should_be_exempt {
            // Preserve a manually curated category; fall back to the
            // configured default only on first exemption.
            if old_status.is_empty() {
                self.settings.default_category.clone()
            } else {
                old_status.clone()
            }
        } else {
            String::new()
        };

        if new_status != old_status {
            self.profile.set_exemption_type(customer, &new_status).await?;
        }

        // Role membership is reconciled even when the tag was already
        // correct, guarding against drift caused by external actors.
        self.roles.reconcile(customer, ctx, should_be_exempt).await?;

        if new_status == old_status {
            return Ok(Evaluation {
                change: StatusChange::Unchanged,
                certificate_cleared,
            });
        }

        info!(%customer, old = %old_status, new = %new_status, "exemption status changed");
        let change = if should_be_exempt {
            StatusChange::Exempt(new_status)
        } else {
            StatusChange::NotExempt
        };
        Ok(Evaluation {
            change,
            certificate_cleared,
        })
    }
}

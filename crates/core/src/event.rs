use serde::{Deserialize, Serialize};

use crate::certificate::CertificateRecord;
use crate::types::CustomerId;

/// One notification kind per fact that can change.
///
/// Each kind is independently routed to a configured webhook target; an
/// unconfigured kind is silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CertificateUpdated,
    Nonprofit501c3Updated,
    ExpirationUpdated,
    StatusUpdated,
    ExpirationApproaching,
}

impl NotificationKind {
    /// Return a string representation of the notification kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CertificateUpdated => "certificate_updated",
            Self::Nonprofit501c3Updated => "501c3_updated",
            Self::ExpirationUpdated => "expiration_updated",
            Self::StatusUpdated => "status_updated",
            Self::ExpirationApproaching => "expiration_approaching",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact fields carried on expiring-soon notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A recognized fact change, emitted exactly once per real change.
///
/// Events carry the normalized new value (and, where downstream consumers
/// need it, the previous value). No-op saves emit nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Certificate uploaded, replaced, or deleted (`None`).
    CertificateUpdated {
        customer: CustomerId,
        certificate: Option<CertificateRecord>,
    },
    /// The 501(c)(3) nonprofit flag was toggled.
    Nonprofit501c3Updated {
        customer: CustomerId,
        is_501c3: bool,
    },
    /// The expiration timestamp changed. `old` lets subscribers distinguish
    /// a forward extension from a backdating edit.
    ExpirationUpdated {
        customer: CustomerId,
        expiration: Option<i64>,
        old_expiration: Option<i64>,
    },
    /// The derived exemption status tag changed (empty = not exempt).
    /// Only emitted while auto-assignment is active.
    StatusUpdated { customer: CustomerId, status: String },
    /// A customer's exemption lapses within the configured horizon.
    ExpirationApproaching {
        customer: CustomerId,
        contact: CustomerContact,
        expiration: i64,
        days_left: i64,
    },
}

impl ChangeEvent {
    /// The notification kind this event maps to.
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::CertificateUpdated { .. } => NotificationKind::CertificateUpdated,
            Self::Nonprofit501c3Updated { .. } => NotificationKind::Nonprofit501c3Updated,
            Self::ExpirationUpdated { .. } => NotificationKind::ExpirationUpdated,
            Self::StatusUpdated { .. } => NotificationKind::StatusUpdated,
            Self::ExpirationApproaching { .. } => NotificationKind::ExpirationApproaching,
        }
    }

    /// The customer the event concerns.
    #[must_use]
    pub fn customer(&self) -> CustomerId {
        match self {
            Self::CertificateUpdated { customer, .. }
            | Self::Nonprofit501c3Updated { customer, .. }
            | Self::ExpirationUpdated { customer, .. }
            | Self::StatusUpdated { customer, .. }
            | Self::ExpirationApproaching { customer, .. } => *customer,
        }
    }
}

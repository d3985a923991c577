use serde::{Deserialize, Serialize};

use crate::event::NotificationKind;
use crate::types::is_exempt_category;

/// Per-kind webhook targets. An absent target disables that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTargets {
    pub certificate: Option<String>,
    #[serde(rename = "501c3")]
    pub nonprofit_501c3: Option<String>,
    pub expiration: Option<String>,
    pub exemption_status: Option<String>,
    pub expiration_approaching: Option<String>,
}

impl WebhookTargets {
    /// The configured target URL for a notification kind, if any.
    #[must_use]
    pub fn target(&self, kind: NotificationKind) -> Option<&str> {
        let target = match kind {
            NotificationKind::CertificateUpdated => &self.certificate,
            NotificationKind::Nonprofit501c3Updated => &self.nonprofit_501c3,
            NotificationKind::ExpirationUpdated => &self.expiration,
            NotificationKind::StatusUpdated => &self.exemption_status,
            NotificationKind::ExpirationApproaching => &self.expiration_approaching,
        };
        target.as_deref().filter(|url| !url.is_empty())
    }
}

/// Operator configuration, passed explicitly into each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Category auto-assigned on first exemption. Empty disables automatic
    /// status management entirely: the evaluator becomes a no-op and
    /// status-updated notifications never fire.
    #[serde(default)]
    pub default_category: String,

    /// Webhook target per notification kind.
    #[serde(default)]
    pub webhooks: WebhookTargets,

    /// All customers are treated as exempt until this timestamp
    /// (onboarding override). Consumed by the tax-calculation collaborator.
    #[serde(default)]
    pub override_cutoff: Option<i64>,

    /// Order statuses forwarded to the remote tax service. Consumed by the
    /// order-processing collaborator.
    #[serde(default = "Settings::default_statuses_to_sync")]
    pub statuses_to_sync: Vec<String>,

    /// Also write operator alerts to the log at their severity level.
    #[serde(default)]
    pub log_admin_errors: bool,

    /// Lead time for expiring-soon alerts, in days.
    #[serde(default = "Settings::default_expiring_alert_days")]
    pub expiring_alert_days: i64,

    /// Time zone expiration dates are entered in. End-of-day normalization
    /// happens in this zone at write time.
    #[serde(default = "Settings::default_timezone")]
    pub timezone: chrono_tz::Tz,
}

impl Settings {
    fn default_statuses_to_sync() -> Vec<String> {
        vec!["completed".to_owned(), "refunded".to_owned()]
    }

    fn default_expiring_alert_days() -> i64 {
        30
    }

    fn default_timezone() -> chrono_tz::Tz {
        chrono_tz::UTC
    }

    /// Whether automatic status assignment is active.
    ///
    /// True only when the configured default is a recognized exemption
    /// category; operators disable auto-assignment by leaving it empty.
    #[must_use]
    pub fn auto_assign_active(&self) -> bool {
        is_exempt_category(&self.default_category)
    }

    /// Whether `now` falls inside the everyone-exempt override period.
    #[must_use]
    pub fn in_override_period(&self, now: i64) -> bool {
        self.override_cutoff.is_some_and(|cutoff| now <= cutoff)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_category: String::new(),
            webhooks: WebhookTargets::default(),
            override_cutoff: None,
            statuses_to_sync: Self::default_statuses_to_sync(),
            log_admin_errors: false,
            expiring_alert_days: Self::default_expiring_alert_days(),
            timezone: Self::default_timezone(),
        }
    }
}

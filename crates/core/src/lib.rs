//! Core domain types for Exemptd.
//!
//! A customer's tax-exemption state is derived from three independently
//! mutated facts: an uploaded certificate record, a 501(c)(3) flag, and an
//! expiration timestamp. This crate defines those facts, the change events
//! that fan out to downstream systems when a fact actually changes, and the
//! configuration and alerting types shared by every other crate.

pub mod alert;
pub mod certificate;
pub mod event;
pub mod notice;
pub mod settings;
pub mod types;

pub use alert::{AlertSeverity, AlertSink, MemoryAlertSink, OperatorAlert, TracingAlertSink};
pub use certificate::{CertificateRecord, ExemptionFacts};
pub use event::{ChangeEvent, CustomerContact, NotificationKind};
pub use notice::{Notice, NoticeLevel};
pub use settings::{Settings, WebhookTargets};
pub use types::{CustomerId, EXEMPT_CATEGORIES, EXEMPT_ROLE, is_exempt_category};

//! Outbound webhook delivery.
//!
//! Subscribes to exemption change events and POSTs one notification per
//! event to the target configured for that event's kind. Targets are
//! independent: an unconfigured or malformed target silently disables its
//! kind, and a failed delivery surfaces as an operator alert upstream
//! without blocking the state change that produced the event.

pub mod payload;
pub mod sender;

pub use payload::{form_encode, payload_for};
pub use sender::{BodyFormat, WebhookNotifier};

//! Attribute store abstraction for Exemptd.
//!
//! Every exemption fact is a keyed attribute on a customer record:
//! certificate, 501(c)(3) flag, expiration, derived exemption type, and the
//! already-alerted marker. The store is pure persistence; all derivation
//! logic lives in `exemptd-engine`.

pub mod error;
pub mod key;
pub mod store;
pub mod testing;

pub use error::StateError;
pub use key::{AttrKey, AttrKind};
pub use store::AttributeStore;

//! Remote customer record reconciliation.
//!
//! Mirrors the locally derived exemption tag into the remote tax service's
//! customer record: create the record if it does not exist, push a
//! local-wins update when the projections drift, and skip the write
//! entirely when they already agree. Failures surface as operator alerts
//! and never touch local state.

pub mod api;
pub mod error;
pub mod record;
pub mod sync;

pub use api::{CustomerRecordApi, MemoryCustomerRecordApi, RestCustomerRecordApi};
pub use error::SyncError;
pub use record::{CustomerRecord, project_tag};
pub use sync::{AlwaysSync, RecordSync, SyncGuard};

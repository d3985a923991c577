//! In-memory [`AttributeStore`](exemptd_state::AttributeStore) backend.

mod store;

pub use store::MemoryAttributeStore;

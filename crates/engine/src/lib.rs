//! Exemption evaluation and synchronization engine.
//!
//! Given a customer's facts tuple (certificate, 501c3 flag, expiration),
//! this crate derives whether the customer is tax-exempt, reconciles the
//! derived state with a status tag and a role, detects real changes versus
//! no-ops, and fans recognized changes out to subscribers exactly once per
//! change. The interactive save path, the deferred back-fill pass, and the
//! daily expiration scanner all run through the same evaluator.

pub mod directory;
pub mod error;
pub mod evaluator;
pub mod notifier;
pub mod profile;
pub mod roles;
pub mod save;
pub mod scanner;
pub mod validity;

pub use directory::{CustomerDirectory, MemoryCustomerDirectory};
pub use error::EngineError;
pub use evaluator::{Evaluation, Evaluator, FactsOverride, StatusChange};
pub use notifier::{ChangeNotifier, ChangeSubscriber, NotifyError};
pub use profile::ProfileStore;
pub use roles::{
    JoinedRoleStringRewriter, MemoryRoleBackend, MultiRoleListRewriter, RoleAssigner, RoleBackend,
    RoleContext, RoleRewriter,
};
pub use save::{ProfileInput, ProfileService, SaveOutcome};
pub use scanner::{AlertMarkerReset, ExpirationScanner};
pub use validity::{HttpProbe, ReachabilityProbe, certificate_is_valid, expiration_is_valid};

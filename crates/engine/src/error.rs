use thiserror::Error;

use exemptd_state::StateError;

/// Errors from engine operations.
///
/// Integration failures (webhook delivery, remote sync, unreachable
/// certificate URLs) are deliberately absent: those degrade to operator
/// alerts and never surface as errors on the write path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The attribute store failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A stored attribute could not be decoded.
    #[error("corrupt attribute {key}: {reason}")]
    CorruptAttribute { key: String, reason: String },

    /// The role backend failed.
    #[error("role backend error: {0}")]
    Role(String),
}

use thiserror::Error;

/// Errors from the remote record API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("remote record request failed: {0}")]
    Http(String),

    /// The remote service answered with a non-success status.
    #[error("remote record API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("remote record response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

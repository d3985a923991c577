use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use exemptd_engine::EngineError;

/// Errors that can occur when running the exemptd server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An engine-level error surfaced through the API.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The requested resource does not exist, or the caller may not know
    /// whether it exists. Authorization failures deliberately land here so
    /// the response does not leak which records are on file.
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            // Plain text, mirroring what download consumers expect to show.
            Self::NotFound(reason) => (StatusCode::NOT_FOUND, reason).into_response(),
            Self::Config(msg) => {
                let body = serde_json::json!({ "error": msg });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
            Self::Io(e) => {
                let body = serde_json::json!({ "error": e.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
            Self::Engine(e) => {
                let body = serde_json::json!({ "error": e.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
        }
    }
}

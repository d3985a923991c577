use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use exemptd_core::CustomerId;

use super::AppState;
use crate::error::ServerError;
use crate::token::is_valid_token;

/// Everything except unreserved characters, per RFC 3986.
const RAW_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const GENERIC_NOT_FOUND: &str = "Certificate data not found.";

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// The requester-bound download token.
    #[serde(default)]
    pub tje: String,
}

/// Strip a filename down to alphanumerics, dash, underscore, and dot,
/// trimmed and capped at 250 characters.
fn sanitize_filename(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let mut cleaned = cleaned.trim().to_owned();
    cleaned.truncate(250);
    cleaned
}

/// Serve one customer's certificate file.
///
/// The requester must present a valid token for this exact (target,
/// requester) pair and either be the target or be on the manager list.
/// Every failure class answers 404 so callers cannot probe which records
/// exist.
pub async fn direct_download(
    State(state): State<Arc<AppState>>,
    Path((target_user_id, current_user_id)): Path<(u64, u64)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ServerError> {
    let target = CustomerId::new(target_user_id);
    let requester = CustomerId::new(current_user_id);

    let authorized = !state.download.secret.is_empty()
        && is_valid_token(&state.download.secret, target, requester, &query.tje)
        && (target == requester || state.download.managers.contains(&current_user_id));
    if !authorized {
        debug!(%target, %requester, "rejecting unauthorized download request");
        return Err(ServerError::NotFound(GENERIC_NOT_FOUND.to_owned()));
    }

    let Some(certificate) = state.profile.certificate(target).await? else {
        return Err(ServerError::NotFound(GENERIC_NOT_FOUND.to_owned()));
    };
    let Some(path) = certificate.path.as_deref() else {
        return Err(ServerError::NotFound(format!(
            "{} not found.",
            certificate.label
        )));
    };

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ServerError::NotFound(format!(
            "{} not found.",
            certificate.label
        )));
    }
    let file = tokio::fs::File::open(path).await.map_err(|_| {
        ServerError::NotFound(format!("{} not readable.", certificate.label))
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|_| ServerError::NotFound(format!("{} not readable.", certificate.label)))?
        .len();

    let filename = sanitize_filename(&certificate.label);
    let encoded = utf8_percent_encode(&filename, RAW_URL).to_string();
    let disposition = format!("attachment; filename=\"{filename}\"; filename*=UTF-8''{encoded}");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        "Content-Description",
        HeaderValue::from_static("File Transfer"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| ServerError::Config(format!("invalid disposition header: {e}")))?,
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("must-revalidate"),
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use exemptd_core::{CertificateRecord, CustomerId, Notice};
use exemptd_engine::{ProfileInput, RoleContext, StatusChange};

use super::AppState;
use crate::error::ServerError;

/// One profile form submission, as posted by the presentation layer.
///
/// The upload collaborator has already stored the file; we receive the
/// normalized record. Role fields are passed through verbatim when the
/// caller's role-aggregation mechanism submitted them.
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub certificate: Option<CertificateRecord>,
    #[serde(default)]
    pub delete_certificate: bool,
    #[serde(default, rename = "501c3")]
    pub is_501c3: bool,
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub joined_roles: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub notices: Vec<Notice>,
    pub status_changed: bool,
    /// New status tag when it changed; empty string means revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Apply a profile save and report notices plus any status transition.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<u64>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ServerError> {
    let customer = CustomerId::new(customer_id);
    let input = ProfileInput {
        certificate_upload: request.certificate,
        delete_certificate: request.delete_certificate,
        is_501c3: request.is_501c3,
        expiration_date: request.expiration_date,
        roles: RoleContext {
            multi_roles: request.roles,
            joined_roles: request.joined_roles,
        },
    };

    let now = chrono::Utc::now().timestamp();
    let outcome = state
        .service
        .save_exemption_fields(customer, input, now)
        .await?;

    let status_changed = outcome.status_change != StatusChange::Unchanged;
    let status = outcome.status_change.new_tag().map(ToOwned::to_owned);
    Ok(Json(SaveResponse {
        notices: outcome.notices,
        status_changed,
        status,
    }))
}

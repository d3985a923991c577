use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use exemptd_engine::{ProfileService, ProfileStore};

use crate::config::DownloadConfig;

pub mod download;
pub mod exemption;
pub mod health;

/// Shared state for all routes.
pub struct AppState {
    pub profile: ProfileStore,
    pub service: Arc<ProfileService>,
    pub download: DownloadConfig,
}

/// Build the full application router.
///
/// Public routes live under the configured namespace; the health probe
/// stays at the root for load balancers.
pub fn router(state: Arc<AppState>) -> Router {
    let namespaced = Router::new()
        .route(
            "/certificate-download/{target_user_id}/{current_user_id}",
            get(download::direct_download),
        )
        .route("/exemption/{customer_id}", post(exemption::save));

    Router::new()
        .nest(&format!("/{}", state.download.namespace), namespaced)
        .route("/healthz", get(health::healthz))
        .with_state(state)
}

//! Router configuration.

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers::{
    account, check, delete, patch_info, receive, send, sendgrid_parse, upload_config, SharedState,
};

/// Create the gateway router: device endpoints, config upload and the
/// inbound-email webhook.
pub fn create_router(state: SharedState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    let device_routes = Router::new()
        .route("/account.cgi", get(account).post(account))
        .route("/patcher.cgi", get(account).post(account))
        .route("/check.cgi", get(check).post(check))
        .route("/receive.cgi", get(receive).post(receive))
        .route("/delete.cgi", get(delete).post(delete))
        .route("/send.cgi", post(send));

    Router::new()
        .nest("/cgi-bin", device_routes)
        .route("/patch", get(patch_info).post(upload_config))
        .route("/sendgrid/parse", post(sendgrid_parse))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload)),
        )
        .with_state(state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Serve files from `path` for any route not otherwise matched.
///
/// Returns `None` when the directory does not exist.
pub fn create_static_router(path: &str) -> Option<Router> {
    if !Path::new(path).is_dir() {
        tracing::warn!("Static directory {:?} not found, static serving disabled", path);
        return None;
    }
    Some(Router::new().fallback_service(ServeDir::new(path)))
}

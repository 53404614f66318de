//! Client configuration upload (`/patch`).

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::patcher::nwc24;
use crate::web::handlers::SharedState;

/// Name of the multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "uploaded_config";

/// GET /patch - Nothing to see without an upload.
pub async fn patch_info() -> &'static str {
    "This page only accepts configuration uploads. Visit the main site to patch your console."
}

/// POST /patch - Patch an uploaded `nwc24msg.cfg` and send it back.
pub async fn upload_config(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let mut content: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read multipart field: {}", e);
                return patch_failed(&state, "invalid upload");
            }
        };

        if field.name() == Some(UPLOAD_FIELD) {
            match field.bytes().await {
                Ok(bytes) => content = Some(bytes.to_vec()),
                Err(e) => {
                    tracing::warn!("Failed to read uploaded config: {}", e);
                    return patch_failed(&state, "invalid upload");
                }
            }
        }
    }

    let Some(content) = content else {
        return patch_failed(&state, "no file was uploaded");
    };

    let patched = match state.patcher.patch(&content) {
        Ok(patched) => patched,
        Err(e) => {
            tracing::info!(error = %e, size = content.len(), "Rejected config upload");
            return patch_failed(&state, &e.to_string());
        }
    };

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", nwc24::FILE_NAME),
        )
        .header(header::CONTENT_LENGTH, patched.len())
        .body(Body::from(patched));

    match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn patch_failed(state: &SharedState, reason: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!(
            "Patching failed. Contact our support email: {}\nError: {}",
            state.config.support.email, reason
        ),
    )
        .into_response()
}

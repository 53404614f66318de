//! Inbound-parse webhook (`/sendgrid/parse`).
//!
//! The provider retries anything that is not a 2xx, so only failures that a
//! retry can fix (store errors) are answered with an error status. Posts
//! that can never be read, including ones over the body limit, are
//! acknowledged and dropped.

use std::collections::HashSet;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};

use crate::bridge::WebhookForm;
use crate::web::handlers::SharedState;

/// POST /sendgrid/parse - Deliver inbound email to device mailboxes.
pub async fn sendgrid_parse(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, String) {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring webhook post that is not multipart");
            return ignored();
        }
    };

    let mut form = WebhookForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(status = %e.status(), "Ignoring unreadable webhook post: {}", e);
                return ignored();
            }
        };

        let name = field.name().unwrap_or("").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::warn!(field = %name, status = %e.status(), "Ignoring unreadable webhook post: {}", e);
                return ignored();
            }
        };

        match name.as_str() {
            "envelope" => form.envelope = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "to" => form.to = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "from" => form.from = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "subject" => form.subject = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "email" => form.email = Some(bytes),
            "text" => form.text = Some(bytes),
            _ => {}
        }
    }

    let envelopes = match form.into_envelopes() {
        Ok(envelopes) => envelopes,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unusable inbound email");
            return ignored();
        }
    };

    let bridge = state.bridge();
    let mut devices = HashSet::new();
    let mut total = 0;
    let mut delivered = 0;

    for envelope in &envelopes {
        // One copy per device, however its address was spelled.
        if let Ok(device_id) = state.pattern.parse(&envelope.to) {
            if !devices.insert(device_id) {
                tracing::debug!(to = %envelope.to, "Skipping repeated recipient");
                continue;
            }
        }
        total += 1;

        match bridge.route(envelope).await {
            Ok(_) => delivered += 1,
            Err(e) if e.is_retryable() => {
                tracing::error!(to = %envelope.to, error = %e, "Failed to store inbound email");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "temporarily unavailable".to_string(),
                );
            }
            Err(e) => {
                tracing::info!(to = %envelope.to, reason = %e, "Inbound email not delivered");
            }
        }
    }

    (StatusCode::OK, format!("delivered {delivered} of {total}"))
}

fn ignored() -> (StatusCode, String) {
    (StatusCode::OK, "ignored".to_string())
}

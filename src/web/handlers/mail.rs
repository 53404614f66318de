//! Device mail endpoints.

use axum::{extract::State, Form};

use crate::mail::SendRequest;
use crate::web::dto::DeviceParams;
use crate::web::error::{ApiError, ResultCode};
use crate::web::handlers::SharedState;
use crate::web::response::{DeviceResponse, ReceiveResponse};

/// GET/POST /cgi-bin/check.cgi - Pending count and next poll interval.
pub async fn check(
    State(state): State<SharedState>,
    Form(params): Form<DeviceParams>,
) -> Result<DeviceResponse, ApiError> {
    let device_id = params
        .device_id(state.config.mail.address_prefix)
        .map_err(|e| state.reject(e))?;
    let passwd = params.passwd().map_err(|e| state.reject(e))?;
    let hint = params.interval().map_err(|e| state.reject(e))?;

    let result = state
        .dispatcher()
        .check(&device_id, passwd, hint)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(DeviceResponse::ok()
        .field("mailnum", result.pending)
        .field("interval", result.interval_secs))
}

/// GET/POST /cgi-bin/receive.cgi - Hand pending mail to the device.
pub async fn receive(
    State(state): State<SharedState>,
    Form(params): Form<DeviceParams>,
) -> Result<ReceiveResponse, ApiError> {
    let device_id = params
        .device_id(state.config.mail.address_prefix)
        .map_err(|e| state.reject(e))?;
    let passwd = params.passwd().map_err(|e| state.reject(e))?;
    let limit = params.limit().map_err(|e| state.reject(e))?;

    let mails = state
        .dispatcher()
        .receive(&device_id, passwd, limit)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(ReceiveResponse::new(mails))
}

/// GET/POST /cgi-bin/delete.cgi - Acknowledge received mail.
pub async fn delete(
    State(state): State<SharedState>,
    Form(params): Form<DeviceParams>,
) -> Result<DeviceResponse, ApiError> {
    let device_id = params
        .device_id(state.config.mail.address_prefix)
        .map_err(|e| state.reject(e))?;
    let passwd = params.passwd().map_err(|e| state.reject(e))?;
    let ids = params.ids().map_err(|e| state.reject(e))?;

    let deleted = state
        .dispatcher()
        .delete(&device_id, passwd, &ids)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(DeviceResponse::ok().field("deletenum", deleted))
}

/// POST /cgi-bin/send.cgi - Accept mail from the device.
pub async fn send(
    State(state): State<SharedState>,
    Form(params): Form<DeviceParams>,
) -> Result<DeviceResponse, ApiError> {
    let device_id = params
        .device_id(state.config.mail.address_prefix)
        .map_err(|e| state.reject(e))?;
    let passwd = params.passwd().map_err(|e| state.reject(e))?;
    let recipient = params.to.clone().ok_or_else(|| {
        state.reject(ApiError::new(ResultCode::InvalidRecipient, "Missing to."))
    })?;

    let mut request = SendRequest::new(recipient, params.body.clone().unwrap_or_default());
    if let Some(subject) = params.subject.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        request = request.with_subject(subject);
    }

    let mail = state
        .dispatcher()
        .send(&device_id, passwd, &request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(DeviceResponse::ok().field("mailid", mail.id))
}

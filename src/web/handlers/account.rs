//! Account endpoint (`/cgi-bin/account.cgi`, `/cgi-bin/patcher.cgi`).

use axum::{extract::State, Form};
use tracing::info;

use crate::account::AccountError;
use crate::web::dto::DeviceParams;
use crate::web::error::ApiError;
use crate::web::handlers::SharedState;
use crate::web::response::DeviceResponse;

/// GET/POST /cgi-bin/account.cgi - Register or authenticate a device.
///
/// A device without an account is registered with the supplied credential;
/// a known device must present the credential it registered with.
pub async fn account(
    State(state): State<SharedState>,
    Form(params): Form<DeviceParams>,
) -> Result<DeviceResponse, ApiError> {
    let device_id = params
        .device_id(state.config.mail.address_prefix)
        .map_err(|e| state.reject(e))?;
    let passwd = params.passwd().map_err(|e| state.reject(e))?;
    let registry = state.registry();

    let (account, registered) = match registry.authenticate(device_id.as_str(), passwd).await {
        Ok(account) => (account, false),
        Err(AccountError::NotFound) => match registry.register(device_id.as_str(), passwd).await {
            Ok(account) => (account, true),
            // Lost a registration race; the winner's credential decides.
            Err(AccountError::AlreadyExists) => (
                registry
                    .authenticate(device_id.as_str(), passwd)
                    .await
                    .map_err(|e| state.reject(e))?,
                false,
            ),
            Err(e) => return Err(state.reject(e)),
        },
        Err(e) => return Err(state.reject(e)),
    };

    if registered {
        info!(device_id = %account.device_id, "Device registered via account endpoint");
    }

    Ok(DeviceResponse::ok()
        .field(
            "mlid",
            format!("{}{}", state.config.mail.address_prefix, account.device_id),
        )
        .field("mailaddr", state.pattern.format(&account.device_id))
        .field("registered", u8::from(registered)))
}

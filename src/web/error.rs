//! Device-facing error responses.
//!
//! Devices read a plain-text body of `key=value` lines. Every error carries
//! a numeric result code (`cd`) alongside the HTTP status.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::account::{AccountError, DeviceIdError};
use crate::mail::DispatchError;
use crate::GatewayError;

/// Result codes understood by devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// 100: request succeeded.
    Success,
    /// 210: the device already has an account.
    AlreadyRegistered,
    /// 220: a parameter is missing or malformed.
    InvalidParameter,
    /// 230: no account for the device.
    UnknownAccount,
    /// 240: credential mismatch.
    BadCredential,
    /// 250: recipient rejected.
    InvalidRecipient,
    /// 350: store unavailable, retry later.
    StoreUnavailable,
    /// 500: internal error.
    InternalError,
}

impl ResultCode {
    /// Numeric code sent as `cd=`.
    pub fn code(&self) -> u16 {
        match self {
            ResultCode::Success => 100,
            ResultCode::AlreadyRegistered => 210,
            ResultCode::InvalidParameter => 220,
            ResultCode::UnknownAccount => 230,
            ResultCode::BadCredential => 240,
            ResultCode::InvalidRecipient => 250,
            ResultCode::StoreUnavailable => 350,
            ResultCode::InternalError => 500,
        }
    }

    /// Get the HTTP status code for this result.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResultCode::Success => StatusCode::OK,
            ResultCode::AlreadyRegistered => StatusCode::CONFLICT,
            ResultCode::InvalidParameter => StatusCode::BAD_REQUEST,
            ResultCode::UnknownAccount => StatusCode::NOT_FOUND,
            ResultCode::BadCredential => StatusCode::UNAUTHORIZED,
            ResultCode::InvalidRecipient => StatusCode::BAD_REQUEST,
            ResultCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ResultCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ResultCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ResultCode::InvalidParameter, message)
    }

    /// Create a store-unavailable error.
    pub fn unavailable() -> Self {
        Self::new(
            ResultCode::StoreUnavailable,
            "Service temporarily unavailable, try again later.",
        )
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(ResultCode::InternalError, "An internal error occurred.")
    }

    /// The result code.
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// The message as it will be sent.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Point the device owner at the support contact for client errors.
    pub fn with_support(mut self, email: &str) -> Self {
        if self.code.status_code().is_client_error() && !email.is_empty() {
            self.message = format!("{} Contact our support email: {}", self.message, email);
        }
        self
    }
}

/// Strip anything that would break a `key=value` line.
pub(crate) fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = format!("cd={}\nmsg={}\n", self.code.code(), single_line(&self.message));
        (
            self.code.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        if err.is_transient() {
            tracing::warn!(error = %err, "Store unavailable");
            ApiError::unavailable()
        } else {
            tracing::error!(error = %err, "Internal error");
            ApiError::internal()
        }
    }
}

impl From<DeviceIdError> for ApiError {
    fn from(err: DeviceIdError) -> Self {
        ApiError::invalid_parameter(format!("Invalid mlid: {err}."))
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidDeviceId(e) => e.into(),
            AccountError::InvalidCredential(e) => {
                ApiError::invalid_parameter(format!("Invalid passwd: {e}."))
            }
            AccountError::AlreadyExists => {
                ApiError::new(ResultCode::AlreadyRegistered, "This device is already registered.")
            }
            AccountError::NotFound => {
                ApiError::new(ResultCode::UnknownAccount, "This device is not registered.")
            }
            AccountError::BadCredential => {
                ApiError::new(ResultCode::BadCredential, "Authentication failed.")
            }
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidDeviceId(e) => e.into(),
            DispatchError::UnknownAccount => {
                ApiError::new(ResultCode::UnknownAccount, "This device is not registered.")
            }
            DispatchError::BadCredential => {
                ApiError::new(ResultCode::BadCredential, "Authentication failed.")
            }
            DispatchError::InvalidRecipient(e) => {
                ApiError::new(ResultCode::InvalidRecipient, format!("Invalid recipient: {e}."))
            }
            DispatchError::InvalidPayload(msg) => {
                ApiError::invalid_parameter(format!("Invalid body: {msg}."))
            }
            DispatchError::Store(e) => e.into(),
        }
    }
}

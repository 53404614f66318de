//! Request parameters sent by devices.

use std::str::FromStr;

use serde::Deserialize;

use super::error::ApiError;
use crate::account::DeviceId;

/// Parameters accepted by the `/cgi-bin/*.cgi` endpoints.
///
/// Everything arrives as text so malformed values produce a `cd=220`
/// response instead of an extractor rejection.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DeviceParams {
    /// Device id, optionally with the address prefix.
    pub mlid: Option<String>,
    /// Device credential.
    pub passwd: Option<String>,
    /// Requested poll interval in seconds.
    pub interval: Option<String>,
    /// Maximum mails to receive.
    pub limit: Option<String>,
    /// Comma-separated mail ids to delete.
    pub ids: Option<String>,
    /// Recipient address.
    pub to: Option<String>,
    /// Mail subject.
    pub subject: Option<String>,
    /// Mail payload.
    pub body: Option<String>,
}

impl DeviceParams {
    /// The device id, stripped of the address prefix.
    pub fn device_id(&self, prefix: char) -> Result<DeviceId, ApiError> {
        let mlid = required(&self.mlid, "mlid")?;
        Ok(DeviceId::from_mlid(mlid, prefix)?)
    }

    /// The credential; an empty value counts as missing.
    pub fn passwd(&self) -> Result<&str, ApiError> {
        required(&self.passwd, "passwd")
    }

    /// The poll interval hint, if sent.
    pub fn interval(&self) -> Result<Option<u64>, ApiError> {
        optional_number(&self.interval, "interval")
    }

    /// The receive limit, if sent.
    pub fn limit(&self) -> Result<Option<u32>, ApiError> {
        optional_number(&self.limit, "limit")
    }

    /// Mail ids to delete. At least one is required.
    pub fn ids(&self) -> Result<Vec<i64>, ApiError> {
        let raw = required(&self.ids, "ids")?;
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| ApiError::invalid_parameter(format!("Invalid ids: {s:?}.")))
            })
            .collect::<Result<Vec<_>, _>>()
            .and_then(|ids| {
                if ids.is_empty() {
                    Err(ApiError::invalid_parameter("Missing ids."))
                } else {
                    Ok(ids)
                }
            })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::invalid_parameter(format!("Missing {name}.")))
}

fn optional_number<T: FromStr>(value: &Option<String>, name: &str) -> Result<Option<T>, ApiError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::invalid_parameter(format!("Invalid {name}."))),
    }
}

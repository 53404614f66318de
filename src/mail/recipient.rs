//! Recipient classification for outgoing device mail.

use thiserror::Error;

use crate::account::DeviceId;
use crate::bridge::{AddressError, AddressPattern};

/// Maximum recipient address length.
pub const MAX_ADDRESS_LENGTH: usize = 254;

/// Recipient validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipientError {
    #[error("recipient is empty")]
    Empty,

    #[error("recipient is too long (max {MAX_ADDRESS_LENGTH} characters)")]
    TooLong,

    #[error("recipient is not a valid email address")]
    InvalidFormat,

    /// The address is on the gateway's own domain but is not a device address.
    #[error("not a device address: {0}")]
    BadDeviceAddress(AddressError),

    /// A device address whose device has no account.
    #[error("device {0} is not registered")]
    UnregisteredDevice(DeviceId),
}

/// Where a Send is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Another device served by this gateway.
    Device(DeviceId),
    /// A real email address handled by the outbound relay.
    External(String),
}

impl Recipient {
    /// Classify and validate a recipient address.
    ///
    /// Addresses on the configured mail domain must be well-formed device
    /// addresses; everything else goes through a basic email format check.
    pub fn parse(address: &str, pattern: &AddressPattern) -> Result<Self, RecipientError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(RecipientError::Empty);
        }

        match pattern.parse(address) {
            Ok(device_id) => return Ok(Recipient::Device(device_id)),
            Err(AddressError::WrongDomain(_)) | Err(AddressError::MissingAt) => {}
            Err(e) => return Err(RecipientError::BadDeviceAddress(e)),
        }

        validate_external(address)?;
        Ok(Recipient::External(address.to_string()))
    }
}

fn validate_external(address: &str) -> Result<(), RecipientError> {
    if address.len() > MAX_ADDRESS_LENGTH {
        return Err(RecipientError::TooLong);
    }

    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RecipientError::InvalidFormat);
    }

    let parts: Vec<&str> = address.split('@').collect();
    if parts.len() != 2 {
        return Err(RecipientError::InvalidFormat);
    }

    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() {
        return Err(RecipientError::InvalidFormat);
    }

    // Domain must have at least one dot and no empty labels.
    if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
        return Err(RecipientError::InvalidFormat);
    }

    Ok(())
}

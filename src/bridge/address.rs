//! Device mail address parsing.
//!
//! A device address has the exact form `<prefix><16 digits>@<domain>`.
//! Anything else is reported with the specific reason it failed.

use thiserror::Error;

use crate::account::{DeviceId, DEVICE_ID_LENGTH};

/// Reasons an address is not a device address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Nothing to parse.
    #[error("address is empty")]
    Empty,

    /// No `@` separating local part and domain.
    #[error("address has no domain")]
    MissingAt,

    /// Domain is not the configured mail domain.
    #[error("domain {0:?} is not served here")]
    WrongDomain(String),

    /// Local part does not start with the address prefix.
    #[error("local part does not start with the device prefix")]
    MissingPrefix,

    /// Local part holds something other than digits after the prefix.
    #[error("device id contains non-digit characters")]
    NonDigit,

    /// Wrong number of digits after the prefix.
    #[error("expected {DEVICE_ID_LENGTH} digits, got {0}")]
    WrongDigitCount(usize),
}

/// Matches device addresses under one mail domain.
#[derive(Debug, Clone)]
pub struct AddressPattern {
    prefix: char,
    domain: String,
}

impl AddressPattern {
    /// Create a pattern for `<prefix><digits>@<domain>`.
    pub fn new(prefix: char, domain: impl Into<String>) -> Self {
        Self {
            prefix,
            domain: domain.into().trim().to_ascii_lowercase(),
        }
    }

    /// The mail domain this pattern matches.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The local-part prefix.
    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Parse a bare address into the device id it names.
    ///
    /// The domain comparison is case-insensitive; the prefix is not.
    ///
    /// # Examples
    ///
    /// ```
    /// use mailgate::bridge::{AddressError, AddressPattern};
    ///
    /// let pattern = AddressPattern::new('w', "mail.example.com");
    /// let id = pattern.parse("w1234567890123456@mail.example.com").unwrap();
    /// assert_eq!(id.as_str(), "1234567890123456");
    ///
    /// assert_eq!(
    ///     pattern.parse("w123@mail.example.com"),
    ///     Err(AddressError::WrongDigitCount(3))
    /// );
    /// ```
    pub fn parse(&self, address: &str) -> Result<DeviceId, AddressError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AddressError::Empty);
        }

        let (local, domain) = address.rsplit_once('@').ok_or(AddressError::MissingAt)?;
        if !domain.eq_ignore_ascii_case(&self.domain) {
            return Err(AddressError::WrongDomain(domain.to_string()));
        }

        let digits = local
            .strip_prefix(self.prefix)
            .ok_or(AddressError::MissingPrefix)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::NonDigit);
        }
        if digits.len() != DEVICE_ID_LENGTH {
            return Err(AddressError::WrongDigitCount(digits.len()));
        }

        DeviceId::parse(digits).map_err(|_| AddressError::WrongDigitCount(digits.len()))
    }

    /// Format the canonical address of a device.
    pub fn format(&self, device_id: &DeviceId) -> String {
        format!("{}{}@{}", self.prefix, device_id, self.domain)
    }
}

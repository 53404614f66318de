//! Device identity.

use std::fmt;

use thiserror::Error;

/// Number of digits in a device id.
pub const DEVICE_ID_LENGTH: usize = 16;

/// Device id parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdError {
    /// Wrong number of characters.
    #[error("device id must be exactly {DEVICE_ID_LENGTH} digits, got {0}")]
    WrongLength(usize),

    /// Contains something other than ASCII digits.
    #[error("device id must contain only digits")]
    NonDigit,
}

/// A 16-digit numeric device identity.
///
/// Leading zeros are significant, so the id is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Parse a bare 16-digit device id.
    ///
    /// # Examples
    ///
    /// ```
    /// use mailgate::DeviceId;
    ///
    /// assert!(DeviceId::parse("1234567890123456").is_ok());
    /// assert!(DeviceId::parse("123").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, DeviceIdError> {
        if s.len() != DEVICE_ID_LENGTH {
            return Err(DeviceIdError::WrongLength(s.chars().count()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DeviceIdError::NonDigit);
        }
        Ok(Self(s.to_string()))
    }

    /// Parse a device id as sent by a device, optionally carrying the
    /// address prefix (`w1234567890123456`).
    pub fn from_mlid(s: &str, prefix: char) -> Result<Self, DeviceIdError> {
        let s = s.trim();
        Self::parse(s.strip_prefix(prefix).unwrap_or(s))
    }

    /// The digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeviceId::parse(&value).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = DeviceId::parse("0000111122223333").unwrap();
        assert_eq!(id.as_str(), "0000111122223333");
        assert_eq!(id.to_string(), "0000111122223333");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(DeviceId::parse("123"), Err(DeviceIdError::WrongLength(3)));
        assert_eq!(
            DeviceId::parse("12345678901234567"),
            Err(DeviceIdError::WrongLength(17))
        );
        assert_eq!(DeviceId::parse(""), Err(DeviceIdError::WrongLength(0)));
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(
            DeviceId::parse("12345678901234a6"),
            Err(DeviceIdError::NonDigit)
        );
        assert_eq!(
            DeviceId::parse("-234567890123456"),
            Err(DeviceIdError::NonDigit)
        );
    }

    #[test]
    fn test_parse_rejects_unicode_digits() {
        // Full-width digits are not ASCII digits.
        assert!(DeviceId::parse("１２３４５６７８９０１２３４５６").is_err());
    }

    #[test]
    fn test_from_mlid() {
        let id = DeviceId::from_mlid("w1234567890123456", 'w').unwrap();
        assert_eq!(id.as_str(), "1234567890123456");

        let bare = DeviceId::from_mlid("1234567890123456", 'w').unwrap();
        assert_eq!(bare, id);

        assert!(DeviceId::from_mlid("x1234567890123456", 'w').is_err());
    }

    #[test]
    fn test_try_from_string() {
        assert!(DeviceId::try_from("1234567890123456".to_string()).is_ok());
        assert!(DeviceId::try_from("bad".to_string()).is_err());
    }
}

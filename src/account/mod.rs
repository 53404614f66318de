//! Device accounts.
//!
//! This module provides:
//! - Device id parsing and validation
//! - Credential derivation bound to the installation secret
//! - Account persistence and the registration/authentication registry

mod credential;
mod device_id;
mod registry;
mod repository;

pub use credential::{
    derive_credential_hash, validate_credential, verify_credential, CredentialError,
    MAX_CREDENTIAL_LENGTH,
};
pub use device_id::{DeviceId, DeviceIdError, DEVICE_ID_LENGTH};
pub use registry::{AccountError, AccountRegistry};
pub use repository::{Account, AccountRepository};

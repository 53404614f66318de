//! Account registration and authentication.

use thiserror::Error;
use tracing::{info, warn};

use super::credential::{derive_credential_hash, verify_credential, CredentialError};
use super::device_id::{DeviceId, DeviceIdError};
use super::repository::{Account, AccountRepository};
use crate::db::Database;
use crate::secret::SecretStore;
use crate::GatewayError;

/// Account registry errors.
#[derive(Error, Debug)]
pub enum AccountError {
    /// The device id is malformed.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(#[from] DeviceIdError),

    /// The supplied credential is unusable.
    #[error("invalid credential: {0}")]
    InvalidCredential(CredentialError),

    /// An account already exists for the device id.
    #[error("account already exists")]
    AlreadyExists,

    /// No account exists for the device id.
    #[error("account not found")]
    NotFound,

    /// The credential does not match.
    #[error("bad credential")]
    BadCredential,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] GatewayError),
}

/// Registers device accounts and verifies their credentials.
pub struct AccountRegistry<'a> {
    db: &'a Database,
    secret: &'a SecretStore,
}

impl<'a> AccountRegistry<'a> {
    /// Create a registry over the given database and installation secret.
    pub fn new(db: &'a Database, secret: &'a SecretStore) -> Self {
        Self { db, secret }
    }

    /// Register a new device account.
    ///
    /// Uniqueness is enforced by the store, so two concurrent registrations
    /// of the same device id yield exactly one account.
    pub async fn register(&self, device_id: &str, raw_credential: &str) -> Result<Account, AccountError> {
        let device_id = DeviceId::parse(device_id)?;
        let raw = raw_credential.to_string();
        let hash = self
            .with_secret(move |secret| derive_credential_hash(secret, &raw))
            .await?
            .map_err(|e| match e {
                CredentialError::HashError(msg) => AccountError::Store(GatewayError::Secret(
                    format!("credential derivation failed: {msg}"),
                )),
                other => AccountError::InvalidCredential(other),
            })?;

        let account = AccountRepository::new(self.db.pool())
            .create(&device_id, &hash)
            .await
            .map_err(|e| match e {
                GatewayError::Conflict(_) => AccountError::AlreadyExists,
                other => AccountError::Store(other),
            })?;

        info!(device_id = %account.device_id, "Device account registered");
        Ok(account)
    }

    /// Authenticate a device.
    ///
    /// An existing account with a wrong credential always yields
    /// `BadCredential`, never `NotFound`.
    pub async fn authenticate(&self, device_id: &str, raw_credential: &str) -> Result<Account, AccountError> {
        let device_id = DeviceId::parse(device_id)?;

        let account = AccountRepository::new(self.db.pool())
            .get(&device_id)
            .await?
            .ok_or(AccountError::NotFound)?;

        let raw = raw_credential.to_string();
        let hash = account.credential_hash.clone();
        let verdict = self
            .with_secret(move |secret| verify_credential(secret, &raw, &hash))
            .await?;

        match verdict {
            Ok(()) => Ok(account),
            Err(CredentialError::HashError(msg)) => Err(AccountError::Store(GatewayError::Secret(
                format!("credential derivation failed: {msg}"),
            ))),
            Err(e) => {
                warn!(device_id = %device_id, error = %e, "Credential rejected");
                Err(AccountError::BadCredential)
            }
        }
    }

    /// Run Argon2 work on the blocking pool.
    async fn with_secret<T, F>(&self, work: F) -> Result<Result<T, CredentialError>, AccountError>
    where
        F: FnOnce(&SecretStore) -> Result<T, CredentialError> + Send + 'static,
        T: Send + 'static,
    {
        let secret = self.secret.clone();
        tokio::task::spawn_blocking(move || work(&secret))
            .await
            .map_err(|e| {
                AccountError::Store(GatewayError::Secret(format!("credential task failed: {e}")))
            })
    }
}

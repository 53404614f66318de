//! Credential derivation.
//!
//! Credentials are hashed with Argon2id using a random per-account salt and
//! the installation secret as the Argon2 secret input, so a stored hash is
//! useless on any other installation.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

use crate::secret::SecretStore;

/// Maximum credential length in bytes.
pub const MAX_CREDENTIAL_LENGTH: usize = 128;

/// Credential-related errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Credential is empty.
    #[error("credential cannot be empty")]
    Empty,

    /// Credential is too long.
    #[error("credential must be at most {MAX_CREDENTIAL_LENGTH} bytes")]
    TooLong,

    /// Credential contains control characters.
    #[error("credential contains invalid characters")]
    InvalidChars,

    /// Hashing failed.
    #[error("credential hashing failed: {0}")]
    HashError(String),

    /// Stored hash is not a valid PHC string.
    #[error("invalid credential hash format")]
    InvalidHash,

    /// The credential does not match the stored hash.
    #[error("credential verification failed")]
    VerificationFailed,
}

/// Create the peppered Argon2 hasher.
///
/// Parameters:
/// - Memory cost: 19 MiB
/// - Time cost: 2 iterations
/// - Parallelism: 1 lane
fn create_argon2(secret: &SecretStore) -> Result<Argon2<'_>, CredentialError> {
    let params = Params::new(19 * 1024, 2, 1, None)
        .map_err(|e| CredentialError::HashError(e.to_string()))?;
    Argon2::new_with_secret(secret.material(), Algorithm::Argon2id, Version::V0x13, params)
        .map_err(|e| CredentialError::HashError(e.to_string()))
}

/// Validate a raw credential before hashing.
pub fn validate_credential(raw: &str) -> Result<(), CredentialError> {
    if raw.is_empty() {
        return Err(CredentialError::Empty);
    }
    if raw.len() > MAX_CREDENTIAL_LENGTH {
        return Err(CredentialError::TooLong);
    }
    if raw.chars().any(|c| c.is_control()) {
        return Err(CredentialError::InvalidChars);
    }
    Ok(())
}

/// Derive the stored hash for a raw credential.
///
/// Returns a PHC-formatted string carrying the salt and parameters.
pub fn derive_credential_hash(secret: &SecretStore, raw: &str) -> Result<String, CredentialError> {
    validate_credential(raw)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = create_argon2(secret)?
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|e| CredentialError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a raw credential against a stored hash.
///
/// The digest comparison is constant-time.
pub fn verify_credential(secret: &SecretStore, raw: &str, hash: &str) -> Result<(), CredentialError> {
    let parsed = PasswordHash::new(hash).map_err(|_| CredentialError::InvalidHash)?;

    create_argon2(secret)?
        .verify_password(raw.as_bytes(), &parsed)
        .map_err(|_| CredentialError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretStore {
        SecretStore::from_bytes(vec![7u8; 128]).unwrap()
    }

    #[test]
    fn test_derive_and_verify() {
        let secret = secret();
        let hash = derive_credential_hash(&secret, "device-password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_credential(&secret, "device-password", &hash).is_ok());
    }

    #[test]
    fn test_wrong_credential_fails() {
        let secret = secret();
        let hash = derive_credential_hash(&secret, "device-password").unwrap();

        let result = verify_credential(&secret, "other-password", &hash);
        assert!(matches!(result, Err(CredentialError::VerificationFailed)));
    }

    #[test]
    fn test_hash_is_bound_to_installation_secret() {
        let hash = derive_credential_hash(&secret(), "device-password").unwrap();
        let other = SecretStore::from_bytes(vec![8u8; 128]).unwrap();

        let result = verify_credential(&other, "device-password", &hash);
        assert!(matches!(result, Err(CredentialError::VerificationFailed)));
    }

    #[test]
    fn test_same_credential_different_salt() {
        let secret = secret();
        let a = derive_credential_hash(&secret, "device-password").unwrap();
        let b = derive_credential_hash(&secret, "device-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_credential(&secret(), "device-password", "not-a-hash");
        assert!(matches!(result, Err(CredentialError::InvalidHash)));
    }

    #[test]
    fn test_validate_credential() {
        assert!(matches!(validate_credential(""), Err(CredentialError::Empty)));
        assert!(matches!(
            validate_credential(&"a".repeat(MAX_CREDENTIAL_LENGTH + 1)),
            Err(CredentialError::TooLong)
        ));
        assert!(matches!(
            validate_credential("pass\nword"),
            Err(CredentialError::InvalidChars)
        ));
        assert!(validate_credential("a").is_ok());
    }
}

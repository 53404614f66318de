//! Installation secret material.
//!
//! One secret is created on first start and reused for the lifetime of the
//! installation. Every account credential is derived with it as the Argon2
//! pepper, so losing or replacing the file invalidates every account.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use rand_core::{OsRng, RngCore};
use tracing::{info, warn};

use crate::{GatewayError, Result};

/// Length of the secret in bytes.
pub const SECRET_LENGTH: usize = 128;

/// Process-wide secret used for credential derivation.
///
/// Read-only after construction; clones share the same bytes. The raw bytes
/// are only visible to the credential derivation code.
#[derive(Clone)]
pub struct SecretStore {
    material: Arc<[u8]>,
}

impl SecretStore {
    /// Load the secret at `path`, creating it when the file does not exist.
    ///
    /// Fails if the file exists but cannot be read, has the wrong length,
    /// or cannot be created.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read(path) {
            Ok(material) => {
                if material.len() != SECRET_LENGTH {
                    return Err(GatewayError::Secret(format!(
                        "{} holds {} bytes, expected {}",
                        path.display(),
                        material.len(),
                        SECRET_LENGTH
                    )));
                }
                info!("Loaded installation secret from {:?}", path);
                Ok(Self {
                    material: material.into(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No secret found at {:?}, creating one", path);
                let material = Self::generate();
                Self::persist(path, &material)?;
                Ok(Self {
                    material: material.into(),
                })
            }
            Err(e) => Err(GatewayError::Secret(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Build a secret from known bytes.
    pub fn from_bytes(material: impl Into<Vec<u8>>) -> Result<Self> {
        let material = material.into();
        if material.is_empty() {
            return Err(GatewayError::Secret("secret cannot be empty".to_string()));
        }
        Ok(Self {
            material: material.into(),
        })
    }

    /// Generate a fresh in-memory secret that is never persisted.
    pub fn ephemeral() -> Self {
        Self {
            material: Self::generate().into(),
        }
    }

    pub(crate) fn material(&self) -> &[u8] {
        &self.material
    }

    fn generate() -> Vec<u8> {
        let mut material = vec![0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut material);
        material
    }

    fn persist(path: &Path, material: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| GatewayError::Secret(format!("failed to create {parent:?}: {e}")))?;
            }
        }

        let mut options = fs::OpenOptions::new();
        // Never overwrite an existing secret.
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(path)
            .map_err(|e| GatewayError::Secret(format!("failed to create {}: {e}", path.display())))?;
        file.write_all(material)
            .and_then(|_| file.sync_all())
            .map_err(|e| GatewayError::Secret(format!("failed to write {}: {e}", path.display())))?;

        info!("Created installation secret at {:?}", path);
        Ok(())
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("material", &"<redacted>")
            .finish()
    }
}

//! Client configuration patcher.
//!
//! Rewrites the endpoint fields of an uploaded client configuration so the
//! client talks to this gateway. The patch works on a copy and returns it
//! only when every field was written, so a failure never yields a
//! partially patched blob.

mod field;
pub mod nwc24;

use thiserror::Error;
use tracing::debug;

pub use field::{FieldDescriptor, FieldEncoding};

/// Config patcher errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The blob is not a configuration file this patcher understands.
    #[error("malformed config: {0}")]
    Malformed(String),

    /// A replacement value does not fit its field.
    #[error("value for {field} does not fit: {reason}")]
    FieldOutOfRange {
        field: &'static str,
        reason: String,
    },
}

/// Rewrites a fixed set of fields in a configuration blob.
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    length: usize,
    magic: &'static [u8],
    checksum: Option<fn(&mut [u8])>,
    fields: Vec<(FieldDescriptor, String)>,
}

impl ConfigPatcher {
    /// Patcher for `nwc24msg.cfg`, pointing every endpoint at `base_url`
    /// and the mail domain at `mail_domain`.
    pub fn nwc24(base_url: &str, mail_domain: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        let mut fields = vec![(nwc24::MAIL_DOMAIN, format!("@{}", mail_domain.trim()))];
        fields.extend(
            nwc24::ENDPOINT_FIELDS
                .iter()
                .map(|(field, script)| (*field, format!("{base}/cgi-bin/{script}.cgi"))),
        );

        Self {
            length: nwc24::CONFIG_LENGTH,
            magic: nwc24::MAGIC,
            checksum: Some(nwc24::write_checksum as fn(&mut [u8])),
            fields,
        }
    }

    /// The fields and values this patcher writes.
    pub fn fields(&self) -> &[(FieldDescriptor, String)] {
        &self.fields
    }

    /// Patch `blob`, returning the rewritten copy.
    pub fn patch(&self, blob: &[u8]) -> Result<Vec<u8>, PatchError> {
        if blob.len() != self.length {
            return Err(PatchError::Malformed(format!(
                "expected {} bytes, got {}",
                self.length,
                blob.len()
            )));
        }
        if !blob.starts_with(self.magic) {
            return Err(PatchError::Malformed("bad magic".to_string()));
        }

        let mut patched = blob.to_vec();
        for (field, value) in &self.fields {
            field.write(&mut patched, value)?;
        }
        if let Some(write_checksum) = self.checksum {
            write_checksum(&mut patched);
        }

        debug!(fields = self.fields.len(), "Config patched");
        Ok(patched)
    }
}

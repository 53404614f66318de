//! Declarative patchable-field descriptors.

use super::PatchError;

/// How a field value is stored in the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// ASCII text followed by NUL padding to the field length.
    NulPaddedAscii,
}

/// A named byte range the patcher overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, used in errors and logs.
    pub name: &'static str,
    /// Byte offset from the start of the blob.
    pub offset: usize,
    /// Field length in bytes.
    pub length: usize,
    /// Value encoding.
    pub encoding: FieldEncoding,
}

impl FieldDescriptor {
    /// Describe a NUL-padded ASCII field.
    pub const fn ascii(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            encoding: FieldEncoding::NulPaddedAscii,
        }
    }

    /// One past the last byte of the field.
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Encode `value` into exactly `length` bytes.
    pub fn encode(&self, value: &str) -> Result<Vec<u8>, PatchError> {
        match self.encoding {
            FieldEncoding::NulPaddedAscii => {
                if !value.is_ascii() {
                    return Err(PatchError::FieldOutOfRange {
                        field: self.name,
                        reason: "value is not ASCII".to_string(),
                    });
                }
                // At least one terminating NUL.
                if value.len() >= self.length {
                    return Err(PatchError::FieldOutOfRange {
                        field: self.name,
                        reason: format!(
                            "value is {} bytes, field holds at most {}",
                            value.len(),
                            self.length - 1
                        ),
                    });
                }
                let mut bytes = vec![0u8; self.length];
                bytes[..value.len()].copy_from_slice(value.as_bytes());
                Ok(bytes)
            }
        }
    }

    /// Overwrite the field in `blob` with `value`.
    pub fn write(&self, blob: &mut [u8], value: &str) -> Result<(), PatchError> {
        let encoded = self.encode(value)?;
        let target = blob
            .get_mut(self.offset..self.end())
            .ok_or(PatchError::FieldOutOfRange {
                field: self.name,
                reason: "field lies outside the blob".to_string(),
            })?;
        target.copy_from_slice(&encoded);
        Ok(())
    }

    /// Read the field's current value, up to the first NUL.
    pub fn read(&self, blob: &[u8]) -> Option<String> {
        let raw = blob.get(self.offset..self.end())?;
        match self.encoding {
            FieldEncoding::NulPaddedAscii => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                Some(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
        }
    }
}

//! Layout of the `nwc24msg.cfg` client mail configuration.

use super::field::FieldDescriptor;

/// Total size of the file.
pub const CONFIG_LENGTH: usize = 0x400;

/// Magic bytes at offset 0.
pub const MAGIC: &[u8; 4] = b"WcCf";

/// Offset of the big-endian checksum word.
pub const CHECKSUM_OFFSET: usize = 0x3FC;

/// Name used when handing the patched file back to the client.
pub const FILE_NAME: &str = "nwc24msg.cfg";

pub const MAIL_DOMAIN: FieldDescriptor = FieldDescriptor::ascii("mail_domain", 0x018, 64);
pub const ACCOUNT_URL: FieldDescriptor = FieldDescriptor::ascii("account_url", 0x09C, 128);
pub const CHECK_URL: FieldDescriptor = FieldDescriptor::ascii("check_url", 0x11C, 128);
pub const RECEIVE_URL: FieldDescriptor = FieldDescriptor::ascii("receive_url", 0x19C, 128);
pub const DELETE_URL: FieldDescriptor = FieldDescriptor::ascii("delete_url", 0x21C, 128);
pub const SEND_URL: FieldDescriptor = FieldDescriptor::ascii("send_url", 0x29C, 128);

/// Endpoint fields paired with the CGI script each one points at.
pub const ENDPOINT_FIELDS: [(FieldDescriptor, &str); 5] = [
    (ACCOUNT_URL, "account"),
    (CHECK_URL, "check"),
    (RECEIVE_URL, "receive"),
    (DELETE_URL, "delete"),
    (SEND_URL, "send"),
];

/// Wrapping sum of the big-endian words preceding the checksum.
pub fn checksum(blob: &[u8]) -> u32 {
    blob[..CHECKSUM_OFFSET.min(blob.len())]
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0u32, |acc, word| acc.wrapping_add(word))
}

/// Recompute and store the checksum.
pub fn write_checksum(blob: &mut [u8]) {
    let sum = checksum(blob);
    if let Some(slot) = blob.get_mut(CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4) {
        slot.copy_from_slice(&sum.to_be_bytes());
    }
}

/// Checksum currently stored in the blob.
#[cfg(test)]
pub(crate) fn stored_checksum(blob: &[u8]) -> Option<u32> {
    let slot = blob.get(CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4)?;
    Some(u32::from_be_bytes([slot[0], slot[1], slot[2], slot[3]]))
}

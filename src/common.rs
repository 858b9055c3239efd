use log::debug;
use thiserror::Error;

/// Report error status
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("{field} must be {expected} hex characters, got {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} contains non-hexadecimal characters")]
    FieldEncoding { field: &'static str },
    #[error("ciphertext length {length} is not a multiple of the 16 byte block size (remainder: {remainder})")]
    BlockAlignment { length: usize, remainder: usize },
    #[error("image is {length} bytes, too small to hold ciphertext at offset {offset}")]
    ImageTooSmall { length: usize, offset: usize },
}

/// Decodes an ASCII hex field, enforcing an exact decoded byte length
pub fn decode_hex_field(
    field: &'static str,
    hex_str: &str,
    byte_len: usize,
) -> Result<Vec<u8>, DecryptError> {
    if hex_str.len() != byte_len * 2 {
        return Err(DecryptError::FieldLength {
            field,
            expected: byte_len * 2,
            actual: hex_str.len(),
        });
    }

    match hex::decode(hex_str) {
        Err(e) => {
            debug!("Failed to decode {} hex: {}", field, e);
            Err(DecryptError::FieldEncoding { field })
        }
        Ok(bytes) => Ok(bytes),
    }
}

use crate::aes::{aes_128_cbc_decrypt, DecryptedImage};
use crate::common::DecryptError;
use crate::header::{find_salt_start, SALT_LENGTH};
use log::{debug, info};

/// Decrypts a full firmware image with the given hex-encoded key and IV.
///
/// The ciphertext is everything after the 8-byte salt; the salt itself sits
/// either right after the `Salted__` marker or at the caller-supplied
/// fallback offset when the image carries no marker.
pub fn decrypt_image(
    image: &[u8],
    key_hex: &str,
    iv_hex: &str,
    fallback_salt_offset: usize,
) -> Result<DecryptedImage, DecryptError> {
    let salt_start = find_salt_start(image, fallback_salt_offset);
    let cipher_data_start = salt_start + SALT_LENGTH;

    debug!("Ciphertext expected at offset {}", cipher_data_start);

    // Everything after the salt is the encrypted data
    let cipher_data = match image.get(cipher_data_start..) {
        Some(data) if !data.is_empty() => data,
        _ => {
            return Err(DecryptError::ImageTooSmall {
                length: image.len(),
                offset: cipher_data_start,
            });
        }
    };

    info!("Decrypting {} bytes of ciphertext", cipher_data.len());

    aes_128_cbc_decrypt(cipher_data, key_hex, iv_hex)
}

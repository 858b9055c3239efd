use crate::common::{decode_hex_field, DecryptError};
use aes::cipher::block_padding::{Pkcs7, RawPadding};
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use log::warn;

/// AES block size; ciphertext length must be a multiple of this
pub const AES_BLOCK_SIZE: usize = 16;

/// Key and IV sizes for the fixed AES-128-CBC configuration
pub const KEY_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Decrypted firmware data.
///
/// `padding_stripped` is false when PKCS7 validation failed and `data` still
/// carries its trailing padding bytes.
#[derive(Debug)]
pub struct DecryptedImage {
    pub data: Vec<u8>,
    pub padding_stripped: bool,
}

/// Decrypts AES-128-CBC ciphertext with a hex-encoded key and IV.
///
/// # Arguments
///
/// * `ciphertext` - The data to decrypt; must be block aligned
/// * `key_hex` - The encryption key as 32 hex characters
/// * `iv_hex` - The initialization vector as 32 hex characters
///
/// # Returns
///
/// The decrypted data or a DecryptError. Invalid PKCS7 padding is not an
/// error: the decrypted bytes are returned unstripped so that firmware with
/// atypical padding can still be recovered, and `padding_stripped` reports
/// which case occurred.
pub fn aes_128_cbc_decrypt(
    ciphertext: &[u8],
    key_hex: &str,
    iv_hex: &str,
) -> Result<DecryptedImage, DecryptError> {
    let key = decode_hex_field("key", key_hex, KEY_SIZE)?;
    let iv = decode_hex_field("iv", iv_hex, IV_SIZE)?;

    if ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(DecryptError::BlockAlignment {
            length: ciphertext.len(),
            remainder: ciphertext.len() % AES_BLOCK_SIZE,
        });
    }

    let mut decryptor = Aes128CbcDec::new(key.as_slice().into(), iv.as_slice().into());

    // Decrypt block by block; padding is dealt with separately below
    let mut decrypted = vec![0; ciphertext.len()];
    for (block, output) in ciphertext
        .chunks(AES_BLOCK_SIZE)
        .zip(decrypted.chunks_mut(AES_BLOCK_SIZE))
    {
        decryptor.decrypt_block_b2b_mut(block.into(), output.into());
    }

    // PKCS7 padding spans at most one block, so validation only ever
    // involves the final block
    let stripped = match decrypted.len() {
        0 => None,
        len => {
            let body_len = len - AES_BLOCK_SIZE;
            Pkcs7::raw_unpad(&decrypted[body_len..])
                .ok()
                .map(|unpadded| [&decrypted[..body_len], unpadded].concat())
        }
    };

    match stripped {
        Some(data) => Ok(DecryptedImage {
            data,
            padding_stripped: true,
        }),
        None => {
            warn!("Padding validation failed, keeping decrypted data as-is");
            Ok(DecryptedImage {
                data: decrypted,
                padding_stripped: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    const KEY_HEX: &str = "00112233445566778899aabbccddeeff";
    const IV_HEX: &str = "0f0e0d0c0b0a09080706050403020100";

    /// AES-128-CBC encryption with PKCS7 padding, the inverse of the
    /// function under test
    fn encrypt_padded(plaintext: &[u8], key_hex: &str, iv_hex: &str) -> Vec<u8> {
        let key = hex::decode(key_hex).unwrap();
        let iv = hex::decode(iv_hex).unwrap();

        let padded_len = (plaintext.len() / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE;
        let mut ciphertext = vec![0u8; padded_len];

        let encryptor = Aes128CbcEnc::new(key.as_slice().into(), iv.as_slice().into());
        encryptor
            .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, &mut ciphertext)
            .unwrap();

        ciphertext
    }

    /// AES-128-CBC encryption of already block aligned data, no padding
    fn encrypt_raw_blocks(plaintext: &[u8], key_hex: &str, iv_hex: &str) -> Vec<u8> {
        assert_eq!(plaintext.len() % AES_BLOCK_SIZE, 0);

        let key = hex::decode(key_hex).unwrap();
        let iv = hex::decode(iv_hex).unwrap();

        let mut encryptor = Aes128CbcEnc::new(key.as_slice().into(), iv.as_slice().into());
        let mut ciphertext = vec![0u8; plaintext.len()];
        for (block, output) in plaintext
            .chunks(AES_BLOCK_SIZE)
            .zip(ciphertext.chunks_mut(AES_BLOCK_SIZE))
        {
            encryptor.encrypt_block_b2b_mut(block.into(), output.into());
        }

        ciphertext
    }

    #[test]
    fn test_roundtrip_strips_padding() {
        let plaintext = b"firmware image payload, not block aligned";
        let ciphertext = encrypt_padded(plaintext, KEY_HEX, IV_HEX);

        let decrypted = aes_128_cbc_decrypt(&ciphertext, KEY_HEX, IV_HEX).unwrap();
        assert!(decrypted.padding_stripped);
        assert_eq!(decrypted.data, plaintext);
    }

    #[test]
    fn test_roundtrip_block_aligned_plaintext() {
        // Block aligned input gains a full padding block on encryption
        let plaintext = [0x5au8; 32];
        let ciphertext = encrypt_padded(&plaintext, KEY_HEX, IV_HEX);
        assert_eq!(ciphertext.len(), 48);

        let decrypted = aes_128_cbc_decrypt(&ciphertext, KEY_HEX, IV_HEX).unwrap();
        assert!(decrypted.padding_stripped);
        assert_eq!(decrypted.data, plaintext);
    }

    #[test]
    fn test_bad_padding_returns_padded_data() {
        // 0x00 is never a valid PKCS7 padding byte, so unpadding must fail
        // and the full decrypted buffer must come back untouched
        let mut plaintext = [0xa5u8; 32];
        plaintext[31] = 0x00;
        let ciphertext = encrypt_raw_blocks(&plaintext, KEY_HEX, IV_HEX);

        let decrypted = aes_128_cbc_decrypt(&ciphertext, KEY_HEX, IV_HEX).unwrap();
        assert!(!decrypted.padding_stripped);
        assert_eq!(decrypted.data, plaintext);
    }

    #[test]
    fn test_oversized_padding_byte_returns_padded_data() {
        // Padding byte larger than the block size is invalid too
        let mut plaintext = [0xa5u8; 16];
        plaintext[15] = 0x11;
        let ciphertext = encrypt_raw_blocks(&plaintext, KEY_HEX, IV_HEX);

        let decrypted = aes_128_cbc_decrypt(&ciphertext, KEY_HEX, IV_HEX).unwrap();
        assert!(!decrypted.padding_stripped);
        assert_eq!(decrypted.data, plaintext);
    }

    #[test]
    fn test_misaligned_ciphertext() {
        for length in [1, 15, 17, 30, 33] {
            let ciphertext = vec![0u8; length];
            let result = aes_128_cbc_decrypt(&ciphertext, KEY_HEX, IV_HEX);
            match result {
                Err(DecryptError::BlockAlignment { length: l, remainder }) => {
                    assert_eq!(l, length);
                    assert_eq!(remainder, length % AES_BLOCK_SIZE);
                }
                other => panic!("expected BlockAlignment error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_key_wrong_length() {
        let result = aes_128_cbc_decrypt(&[0u8; 16], "0011223344", IV_HEX);
        assert!(matches!(
            result,
            Err(DecryptError::FieldLength {
                field: "key",
                expected: 32,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_key_non_hex() {
        let result = aes_128_cbc_decrypt(&[0u8; 16], "g0112233445566778899aabbccddeeff", IV_HEX);
        assert!(matches!(
            result,
            Err(DecryptError::FieldEncoding { field: "key" })
        ));
    }

    #[test]
    fn test_iv_wrong_length() {
        let result = aes_128_cbc_decrypt(&[0u8; 16], KEY_HEX, "00ff");
        assert!(matches!(
            result,
            Err(DecryptError::FieldLength {
                field: "iv",
                expected: 32,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_iv_non_hex() {
        let result = aes_128_cbc_decrypt(&[0u8; 16], KEY_HEX, "xx112233445566778899aabbccddeeff");
        assert!(matches!(
            result,
            Err(DecryptError::FieldEncoding { field: "iv" })
        ));
    }

    #[test]
    fn test_wrong_key_does_not_roundtrip() {
        let plaintext = b"secret firmware bytes";
        let ciphertext = encrypt_padded(plaintext, KEY_HEX, IV_HEX);

        let wrong_key = "ffffffffffffffffffffffffffffffff";
        let decrypted = aes_128_cbc_decrypt(&ciphertext, wrong_key, IV_HEX).unwrap();
        assert_ne!(decrypted.data, plaintext);
    }
}

use crate::common::{decode_hex_field, DecryptError};
use crate::header::SALT_LENGTH;
use log::info;
use std::collections::HashMap;

/// Returns a HashMap of passphrases that resolve to a pinned key/IV pair.
///
/// The M30 v1.02 - v1.10 firmware passphrase must always produce the same
/// key and IV, whatever salt is supplied, so its precomputed values are
/// returned directly instead of running the derivation below.
pub fn key_overrides() -> HashMap<String, (String, String)> {
    HashMap::from([(
        "b4517d9b98e04d9f075f5e78c743e097".to_string(),
        (
            "B9226D8C159A2B72A5A19370FED9359B".to_string(),
            "CD50AE7CEB53AB3476B9F46F52D05CFA".to_string(),
        ),
    )])
}

/// Returns the MD5 hash of the provided data
fn md5_digest(data: &[u8]) -> Vec<u8> {
    md5::compute(data).0.to_vec()
}

/// Calculates the encryption key and IV from the passphrase and salt values.
///
/// This matches OpenSSL's legacy `EVP_BytesToKey` with an MD5 digest: hashes
/// of `last hash + passphrase + salt` are accumulated until enough key
/// material exists, then split into key and IV. The salt must be 16 hex
/// characters (8 bytes). Both outputs are returned as hex strings.
///
/// Passphrases listed in [`key_overrides`] skip the derivation entirely.
pub fn derive_key_iv(
    password: &str,
    salt_hex: &str,
    key_size: usize,
    iv_size: usize,
) -> Result<(String, String), DecryptError> {
    // Pinned key/IV pairs take precedence over any derivation
    if let Some((key_hex, iv_hex)) = key_overrides().get(password) {
        info!("Known device passphrase, using pinned key/IV");
        return Ok((key_hex.clone(), iv_hex.clone()));
    }

    let salt = decode_hex_field("salt", salt_hex, SALT_LENGTH)?;

    // Concatenate passphrase and salt
    let mut pass_salt: Vec<u8> = Vec::new();
    pass_salt.extend(password.bytes());
    pass_salt.extend(&salt);

    // Generate a hash of the passphrase + salt
    let mut hash = md5_digest(&pass_salt);
    let mut key_material = hash.clone();

    // Loop until key_material covers both the key and the IV
    while key_material.len() < key_size + iv_size {
        let mut hash_input: Vec<u8> = Vec::new();

        // Input to this hash calculation is the last hash computed + passphrase + salt
        hash_input.extend(hash);
        hash_input.extend(pass_salt.clone());

        hash = md5_digest(&hash_input);

        // Append the most recently calculated hash to key_material
        key_material.extend(hash.clone());
    }

    let key = &key_material[0..key_size];
    let iv = &key_material[key_size..key_size + iv_size];

    Ok((hex::encode(key), hex::encode(iv)))
}

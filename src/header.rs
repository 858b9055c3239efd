use log::debug;

/// Marker preceding the salt in OpenSSL password-encrypted output
pub const SALTED_MAGIC: &[u8] = b"Salted__";

/// Size of the salt that follows the magic marker
pub const SALT_LENGTH: usize = 8;

/// Locates the start of the salt within a firmware image.
///
/// Scans for the first `Salted__` marker; the salt begins immediately after
/// it. The marker is not required to sit at offset zero, as some images carry
/// a vendor header in front of the OpenSSL data. Images with no marker fall
/// back to the caller-supplied offset.
pub fn find_salt_start(data: &[u8], fallback_offset: usize) -> usize {
    match data
        .windows(SALTED_MAGIC.len())
        .position(|window| window == SALTED_MAGIC)
    {
        Some(index) => {
            let salt_start = index + SALTED_MAGIC.len();
            debug!("Found salt marker, salt starts at offset {}", salt_start);
            salt_start
        }
        None => {
            debug!(
                "No salt marker found, using fallback offset {}",
                fallback_offset
            );
            fallback_offset
        }
    }
}

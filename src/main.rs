use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod aes;
mod common;
mod decryptor;
mod header;
mod openssl;

/// IV baked into known firmware releases, used when no IV is given
const DEFAULT_IV_HEX: &str = "CD50AE7CEB53AB3476B9F46F52D05CFA";

/// Default salt offset, matching OpenSSL output where the salt sits right
/// after the 8 byte magic marker
const DEFAULT_SALT_START: usize = 8;

/// Decrypts AES-128-CBC encrypted firmware images. The key and IV are either
/// given directly as hex, or derived from a passphrase and salt the way
/// OpenSSL does.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the encrypted firmware image
    #[arg(short, long)]
    source: PathBuf,

    /// Path to write the decrypted data to
    #[arg(short, long, default_value = "decrypted_firmware.bin")]
    destination: PathBuf,

    /// Decryption key as 32 hex characters, or the KDF passphrase when
    /// --salt-hex is given
    #[arg(short, long)]
    key: String,

    /// Decryption IV as 32 hex characters
    #[arg(short, long, default_value = DEFAULT_IV_HEX)]
    iv: String,

    /// 8-byte salt as 16 hex characters; selects passphrase derivation mode
    #[arg(short = 'T', long)]
    salt_hex: Option<String>,

    /// Salt offset to assume when the image has no 'Salted__' marker
    #[arg(short = 'S', long, default_value_t = DEFAULT_SALT_START)]
    salt_start: usize,
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("key derivation failure")]
    DeriveFail,
    #[error("decryption failure")]
    DecryptFail,
    #[error("failed to write data to disk")]
    WriteFail,
    #[error("failed to read data from disk")]
    ReadFail,
}

fn main() -> Result<(), ApplicationError> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Passphrase derivation mode is selected by the presence of a salt;
    // otherwise the key and IV arguments are used as-is
    let (key_hex, iv_hex) = match &args.salt_hex {
        Some(salt_hex) => {
            info!("Deriving key/IV from passphrase and salt");
            match openssl::derive_key_iv(&args.key, salt_hex, aes::KEY_SIZE, aes::IV_SIZE) {
                Err(e) => {
                    error!("Key derivation failed: {}", e);
                    return Err(ApplicationError::DeriveFail);
                }
                Ok((key_hex, iv_hex)) => {
                    info!("Derived key: {}", key_hex);
                    info!("Derived IV: {}", iv_hex);
                    (key_hex, iv_hex)
                }
            }
        }
        None => (args.key.clone(), args.iv.clone()),
    };

    // Read the contents of the input file
    let file_data = match std::fs::read(&args.source) {
        Err(e) => {
            error!(
                "Failed to read input file '{}': {}",
                args.source.display(),
                e
            );
            return Err(ApplicationError::ReadFail);
        }
        Ok(file_data) => file_data,
    };

    match decryptor::decrypt_image(&file_data, &key_hex, &iv_hex, args.salt_start) {
        Err(e) => {
            error!("Decryption failed: {}", e);
            Err(ApplicationError::DecryptFail)
        }
        Ok(decrypted) => {
            info!("Decryption successful!");
            if !decrypted.padding_stripped {
                warn!("Saved data retains its padding bytes");
            }
            if write_decrypted_data(&args.destination, &decrypted.data) {
                Ok(())
            } else {
                Err(ApplicationError::WriteFail)
            }
        }
    }
}

fn write_decrypted_data(file_name: &Path, decrypted_data: &[u8]) -> bool {
    // Write decrypted contents to the output file
    match std::fs::write(file_name, decrypted_data) {
        Err(e) => {
            error!(
                "Failed to save decrypted data to '{}': {}",
                file_name.display(),
                e
            );
            false
        }
        Ok(_) => {
            info!("Decrypted data saved to: {}", file_name.display());
            true
        }
    }
}

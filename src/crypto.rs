use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Prefix marking a `login.password` value as sealed.
pub const SEALED_PREFIX: &str = "sealed:";

/// Machine-bound password sealing, so credentials in `properties.ini`
/// are not stored in the clear.
pub struct PasswordCrypto;

impl PasswordCrypto {
    /// Generates a machine-specific encryption key.
    ///
    /// Depends on the host only, never on the session environment: cron and
    /// systemd jobs must derive the same key as an interactive shell.
    pub fn get_machine_key() -> [u8; 32] {
        Self::derive_key(host_identifier().as_deref())
    }

    fn derive_key(host: Option<&str>) -> [u8; 32] {
        let mut hasher = Sha256::new();

        let mut machine_data = BTreeMap::new();
        if let Some(host) = host {
            machine_data.insert("host", host.to_string());
        }
        machine_data.insert("os", std::env::consts::OS.to_string());
        machine_data.insert("arch", std::env::consts::ARCH.to_string());

        for (key, value) in machine_data {
            hasher.update(key.as_bytes());
            hasher.update(b":");
            hasher.update(value.as_bytes());
            hasher.update(b";");
        }

        hasher.update(b"payslip_downloader_v1_password_key");

        let hash = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&hash);
        key
    }

    /// Encrypts `plaintext` into a `sealed:<nonce>:<ciphertext>` token.
    pub fn seal_password(plaintext: &str) -> Result<String> {
        let key = Self::get_machine_key();

        let cipher = Aes256Gcm::new(&key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        Ok(format!(
            "{}{}:{}",
            SEALED_PREFIX,
            BASE64.encode(nonce),
            BASE64.encode(&ciphertext)
        ))
    }

    /// Returns the plaintext for a sealed token; other values pass through.
    pub fn open_password(value: &str) -> Result<String> {
        let Some(token) = value.trim().strip_prefix(SEALED_PREFIX) else {
            return Ok(value.to_string());
        };

        let (nonce_b64, data_b64) = token
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Sealed password is missing its nonce"))?;

        let nonce_bytes = BASE64.decode(nonce_b64)
            .context("Failed to decode nonce")?;

        if nonce_bytes.len() != 12 {
            return Err(anyhow::anyhow!("Invalid nonce length"));
        }

        let ciphertext = BASE64.decode(data_b64)
            .context("Failed to decode encrypted data")?;

        let key = Self::get_machine_key();

        let cipher = Aes256Gcm::new(&key.into());
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| anyhow::anyhow!("Decryption failed; the password was probably sealed on another machine"))?;

        String::from_utf8(plaintext)
            .context("Decrypted data is not valid UTF-8")
    }

    pub fn is_sealed(value: &str) -> bool {
        value.trim().starts_with(SEALED_PREFIX)
    }
}

/// Files holding the host's persistent machine id on Linux.
const MACHINE_ID_FILES: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// The machine id where the OS keeps one, otherwise the host name.
fn host_identifier() -> Option<String> {
    MACHINE_ID_FILES
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
        .or_else(|| {
            std::env::var("COMPUTERNAME")
                .or_else(|_| std::env::var("HOSTNAME"))
                .ok()
        })
}

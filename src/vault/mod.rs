// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key vault for the custodial secret table.
//!
//! Register and reserve secrets are stored as XChaCha20-Poly1305 ciphertext,
//! base64-encoded, in configuration. The vault key is derived from the
//! operator passphrase via Argon2id at startup and never leaves this module.
//! Decrypted secrets are wrapped in [`Secret`], which redacts `Debug` output
//! and zeroizes on drop.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::{Algorithm, Argon2, Params, Version};
use base64ct::{Base64, Encoding};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, XChaCha20Poly1305, XNonce,
};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Argon2id parameters for vault key derivation.
const TIME_COST: u32 = 3;
const MEMORY_COST: u32 = 65536; // 64 MiB
const PARALLELISM: u32 = 4;
const KEY_LEN: usize = 32;

/// XChaCha20 nonce length prepended to every ciphertext.
const NONCE_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid base64 ciphertext")]
    InvalidEncoding,

    #[error("ciphertext too short")]
    TruncatedCiphertext,

    #[error("decryption failed (wrong key or tampered data)")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decrypted secret is not valid UTF-8")]
    InvalidPlaintext,

    #[error("reserve entry missing from configuration")]
    MissingReserve,
}

/// A decrypted secret. Redacted in logs, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Expose the plaintext. Callers must not log or persist it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Vault holding the derived master key as an AEAD cipher.
pub struct KeyVault {
    cipher: XChaCha20Poly1305,
    fingerprint: String,
}

impl KeyVault {
    /// Derive the vault key from a passphrase and salt (Argon2id).
    pub fn derive(passphrase: &str, salt: &[u8]) -> Result<Self, VaultError> {
        let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(KEY_LEN))
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

        let fingerprint = key_fingerprint(&key);
        let cipher = XChaCha20Poly1305::new((&key).into());
        key.zeroize();

        Ok(Self {
            cipher,
            fingerprint,
        })
    }

    /// Short key fingerprint, safe to log for rotation tracking.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypt a plaintext value. Output is base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(Base64::encode_string(&combined))
    }

    /// Decrypt a base64(nonce || ciphertext) value.
    pub fn decrypt(&self, encoded: &str) -> Result<Secret, VaultError> {
        let combined = Base64::decode_vec(encoded).map_err(|_| VaultError::InvalidEncoding)?;
        if combined.len() <= NONCE_LEN {
            return Err(VaultError::TruncatedCiphertext);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)?;
        match String::from_utf8(plaintext) {
            Ok(value) => Ok(Secret::new(value)),
            Err(e) => {
                let mut bytes = e.into_bytes();
                bytes.zeroize();
                Err(VaultError::InvalidPlaintext)
            }
        }
    }

    /// Decrypt the custodial table (encrypted address -> encrypted secret)
    /// into a plaintext address -> secret map.
    pub fn decrypt_address_table(
        &self,
        table: &HashMap<String, String>,
    ) -> Result<HashMap<String, Secret>, VaultError> {
        let mut decrypted = HashMap::with_capacity(table.len());
        for (enc_address, enc_secret) in table {
            let address = self.decrypt(enc_address)?;
            let secret = self.decrypt(enc_secret)?;
            decrypted.insert(address.expose().to_string(), secret);
        }
        Ok(decrypted)
    }
}

fn key_fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Decrypted view of the custodial pool: register secrets plus the reserve.
///
/// Reloadable at runtime so the operator can rotate the table without a
/// restart (SIGHUP re-reads configuration).
pub struct CustodialDirectory {
    inner: RwLock<DirectoryState>,
}

struct DirectoryState {
    registers: HashMap<String, Secret>,
    reserve_address: String,
    reserve_secret: Secret,
}

impl CustodialDirectory {
    /// Decrypt the configured tables and build the directory.
    pub fn load(
        vault: &KeyVault,
        encrypted_registers: &HashMap<String, String>,
        encrypted_reserve: &HashMap<String, String>,
    ) -> Result<Self, VaultError> {
        let state = DirectoryState::decrypt(vault, encrypted_registers, encrypted_reserve)?;
        tracing::info!(
            registers = state.registers.len(),
            key_fingerprint = %vault.fingerprint(),
            "custodial directory loaded"
        );
        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    /// Replace the directory contents with a freshly decrypted table.
    pub fn reload(
        &self,
        vault: &KeyVault,
        encrypted_registers: &HashMap<String, String>,
        encrypted_reserve: &HashMap<String, String>,
    ) -> Result<(), VaultError> {
        let state = DirectoryState::decrypt(vault, encrypted_registers, encrypted_reserve)?;
        let registers = state.registers.len();
        if let Ok(mut guard) = self.inner.write() {
            *guard = state;
        }
        tracing::info!(
            registers,
            key_fingerprint = %vault.fingerprint(),
            "custodial directory reloaded"
        );
        Ok(())
    }

    /// Whether an address belongs to the custodial pool.
    pub fn contains(&self, address: &str) -> bool {
        self.inner
            .read()
            .map(|s| s.registers.contains_key(address))
            .unwrap_or(false)
    }

    /// Signing secret for a custodial register.
    pub fn secret_for(&self, address: &str) -> Option<Secret> {
        self.inner
            .read()
            .ok()
            .and_then(|s| s.registers.get(address).cloned())
    }

    /// The reserve address and its signing secret.
    pub fn reserve(&self) -> Option<(String, Secret)> {
        self.inner
            .read()
            .ok()
            .map(|s| (s.reserve_address.clone(), s.reserve_secret.clone()))
    }

    /// All register addresses, for bootstrap seeding.
    pub fn register_addresses(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|s| s.registers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl DirectoryState {
    fn decrypt(
        vault: &KeyVault,
        encrypted_registers: &HashMap<String, String>,
        encrypted_reserve: &HashMap<String, String>,
    ) -> Result<Self, VaultError> {
        let registers = vault.decrypt_address_table(encrypted_registers)?;

        let (enc_address, enc_secret) = encrypted_reserve
            .iter()
            .next()
            .ok_or(VaultError::MissingReserve)?;
        let reserve_address = vault.decrypt(enc_address)?.expose().to_string();
        let reserve_secret = vault.decrypt(enc_secret)?;

        Ok(Self {
            registers,
            reserve_address,
            reserve_secret,
        })
    }
}

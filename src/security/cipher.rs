//! Passphrase-keyed AES-256-GCM.
//!
//! Blob layout: `base64(nonce[12] || ciphertext || tag[16])`. The key is
//! derived once per instance with PBKDF2-HMAC-SHA256.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use crate::config::StorageConfig;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("passphrase must not be empty")]
    EmptyPassphrase,

    #[error("encryption failed")]
    Encrypt,

    #[error("invalid encoding: {0}")]
    Encoding(String),

    #[error("ciphertext too short")]
    Truncated,

    /// Wrong key or tampered blob. AES-GCM does not tell them apart.
    #[error("authentication failed")]
    Authentication,
}

/// Symmetric cipher over a passphrase-derived key.
pub struct SymmetricCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCipher").finish_non_exhaustive()
    }
}

impl SymmetricCipher {
    /// Derive a key from `passphrase` and `salt`.
    pub fn new(passphrase: &str, salt: &str, rounds: u32) -> Result<Self, CipherError> {
        if passphrase.is_empty() {
            return Err(CipherError::EmptyPassphrase);
        }
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt.as_bytes(), rounds, &mut key);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::Encrypt)?;
        Ok(Self { cipher })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, CipherError> {
        Self::new(&config.passphrase, &config.key_salt, config.pbkdf2_rounds)
    }

    /// Encrypt under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, CipherError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(blob)
            .map_err(|e| CipherError::Encoding(e.to_string()))?;
        if data.len() < NONCE_LEN {
            return Err(CipherError::Truncated);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Authentication)
    }
}

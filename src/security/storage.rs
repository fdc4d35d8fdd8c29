//! Encrypted key/value storage on an untrusted backing store.
//!
//! Values are serialized to JSON and sealed with [`SymmetricCipher`] before
//! they reach the store. Anything that fails to open or parse on the way
//! back is treated as tampered: the entry is deleted and `None` returned.

use std::sync::Arc;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::security::cipher::{CipherError, SymmetricCipher};

/// Client-side persisted storage. Implementations may be read or modified
/// by the end user.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-process store, mainly for tests and server-side sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.inner.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Encrypting wrapper around a [`KeyValueStore`].
pub struct SecureStorage<S> {
    cipher: Arc<SymmetricCipher>,
    store: S,
}

impl<S: KeyValueStore> SecureStorage<S> {
    pub fn new(cipher: Arc<SymmetricCipher>, store: S) -> Self {
        Self { cipher, store }
    }

    /// Serialize, encrypt and store `value` under `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec(value)?;
        let blob = self.cipher.encrypt(&json)?;
        self.store.set(key, blob);
        Ok(())
    }

    /// Load and decrypt `key`. Corrupt or foreign entries are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let blob = self.store.get(key)?;

        let value = self
            .cipher
            .decrypt(&blob)
            .map_err(|e| e.to_string())
            .and_then(|plain| serde_json::from_slice(&plain).map_err(|e| e.to_string()));

        match value {
            Ok(value) => Some(value),
            Err(reason) => {
                tracing::warn!(key, reason = %reason, "Discarding unreadable secure storage entry");
                self.store.remove(key);
                None
            }
        }
    }

    pub fn remove(&self, key: &str) {
        self.store.remove(key);
    }

    /// Access the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

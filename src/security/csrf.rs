//! CSRF token issuance and validation.
//!
//! Tokens are 256 random bits, URL-safe base64 encoded. By default a token
//! stays valid for repeated checks until it expires; `single_use` consumes
//! it on the first successful check instead.
//!
//! Issuance is refused while the store is full of unexpired tokens.

use std::sync::Arc;
use base64::Engine;
use dashmap::DashMap;
use rand::RngCore;

use crate::config::CsrfConfig;
use crate::observability::metrics;
use crate::security::capacity::CapacityGuard;
use crate::security::clock::Clock;

/// CSRF token length in bytes (before base64 encoding).
const TOKEN_BYTES: usize = 32;

/// In-memory CSRF token store.
#[derive(Debug)]
pub struct CsrfTokenStore {
    tokens: DashMap<String, u64>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    single_use: bool,
    capacity: CapacityGuard,
}

impl CsrfTokenStore {
    pub fn new(config: &CsrfConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
            ttl_ms: config.ttl_secs.saturating_mul(1000),
            single_use: config.single_use,
            capacity: CapacityGuard::new("csrf", config.max_entries),
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_ms / 1000
    }

    /// Issue a fresh token, or `None` if the store is full.
    pub fn issue(&self) -> Option<String> {
        let now = self.clock.now_ms();
        if !self.capacity.admit(now, || self.tokens.len(), || self.sweep()) {
            tracing::debug!("CSRF store full, token not issued");
            return None;
        }

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        self.tokens.insert(token.clone(), now.saturating_add(self.ttl_ms));
        metrics::record_csrf_issued();
        Some(token)
    }

    /// Check a token. Expired tokens are evicted and rejected.
    pub fn validate(&self, token: &str) -> bool {
        let now = self.clock.now_ms();
        if self
            .tokens
            .remove_if(token, |_, expires_at| now > *expires_at)
            .is_some()
        {
            tracing::debug!("Expired CSRF token rejected");
            return false;
        }

        if self.single_use {
            self.tokens.remove(token).is_some()
        } else {
            self.tokens.contains_key(token)
        }
    }

    /// Remove every expired token. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.tokens.len();
        self.tokens.retain(|_, expires_at| now <= *expires_at);
        before.saturating_sub(self.tokens.len())
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

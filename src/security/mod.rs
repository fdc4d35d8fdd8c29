//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → gate.rs (blocklist, user agent, admin referer, rate limit,
//!                content type, URL heuristic)
//!     → headers.rs (stamp security headers on admitted responses)
//!     → Pass to upstream
//!
//! Authentication flow (external caller):
//!     → login.rs check_allowed → identity provider verify → record_failure / clear
//!
//! Form and admin handlers (external callers):
//!     → csrf.rs issue / validate
//!     → input.rs sanitize / validate
//!     → storage.rs put / get (cipher.rs underneath)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - All state is in-memory and owned here; callers only see booleans and tokens

pub mod capacity;
pub mod cipher;
pub mod clock;
pub mod compare;
pub mod csrf;
pub mod gate;
pub mod headers;
pub mod input;
pub mod login;
pub mod rate_limit;
pub mod storage;
pub mod suspicion;

use std::sync::Arc;

use crate::config::GateConfig;
use self::cipher::{CipherError, SymmetricCipher};
use self::clock::Clock;
use self::csrf::CsrfTokenStore;
use self::gate::EdgeGate;
use self::login::LoginAttemptGuard;
use self::rate_limit::RateLimiter;
use self::storage::{KeyValueStore, SecureStorage};
use self::suspicion::SuspicionTracker;

/// Every stateful security component, wired together from one config.
#[derive(Debug, Clone)]
pub struct SecurityCore {
    pub clock: Arc<dyn Clock>,
    pub limiter: Arc<RateLimiter>,
    pub suspicion: Arc<SuspicionTracker>,
    pub login: Arc<LoginAttemptGuard>,
    pub csrf: Arc<CsrfTokenStore>,
    pub cipher: Arc<SymmetricCipher>,
    pub gate: Arc<EdgeGate>,
}

impl SecurityCore {
    /// Build all components. Fails only if the storage key cannot be derived.
    pub fn new(config: &GateConfig, clock: Arc<dyn Clock>) -> Result<Self, CipherError> {
        let cipher = Arc::new(SymmetricCipher::from_config(&config.storage)?);
        let limiter = Arc::new(RateLimiter::new(clock.clone(), config.rate_limit.max_entries));
        let suspicion = Arc::new(SuspicionTracker::new(&config.suspicion, clock.clone()));
        let login = Arc::new(LoginAttemptGuard::new(
            &config.login,
            suspicion.clone(),
            clock.clone(),
        ));
        let csrf = Arc::new(CsrfTokenStore::new(&config.csrf, clock.clone()));
        let gate = Arc::new(EdgeGate::new(
            &config.gate,
            &config.rate_limit,
            limiter.clone(),
            suspicion.clone(),
        ));

        Ok(Self {
            clock,
            limiter,
            suspicion,
            login,
            csrf,
            cipher,
            gate,
        })
    }

    /// Encrypted storage over `store`, keyed by the configured passphrase.
    pub fn secure_storage<S: KeyValueStore>(&self, store: S) -> SecureStorage<S> {
        SecureStorage::new(self.cipher.clone(), store)
    }

    /// Run one sweep over every store. Returns the total number of evictions.
    pub fn sweep(&self) -> usize {
        let results = [
            ("csrf", self.csrf.sweep(), self.csrf.len()),
            ("rate_limit", self.limiter.sweep(), self.limiter.len()),
            ("login", self.login.sweep(), self.login.len()),
            ("suspicion", self.suspicion.sweep(), self.suspicion.len()),
        ];

        let mut total = 0;
        for (store, evicted, remaining) in results {
            crate::observability::metrics::record_sweep(store, evicted, remaining);
            if evicted > 0 {
                tracing::debug!(store, evicted, remaining, "Swept expired entries");
            }
            total += evicted;
        }
        total
    }
}

//! Failed-login tracking and lockout.
//!
//! # States
//! ```text
//! Open → Locked: attempts reach max_attempts (lockout starts, suspicion signalled)
//! Locked → Open: lockout elapsed, observed by the next check (counter cleared)
//! any → Open: successful authentication (`clear`)
//! ```
//!
//! While the guard is full, identifiers it cannot track are treated as
//! locked: verification must not run without failure accounting.
//!
//! The guard wraps the identity provider's verification call; it never
//! issues or inspects identity tokens itself.

use std::future::Future;
use std::sync::Arc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::LoginConfig;
use crate::observability::metrics;
use crate::security::capacity::CapacityGuard;
use crate::security::clock::Clock;
use crate::security::compare::timing_safe_eq;
use crate::security::suspicion::{SuspicionKind, SuspicionTracker};

/// Outcome of a guarded authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginError {
    /// Carries no remaining lockout time.
    #[error("Too many failed attempts. Please try again later.")]
    LockedOut,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

#[derive(Debug, Clone, Copy)]
struct LoginRecord {
    attempts: u32,
    locked_until: Option<u64>,
    last_failure: u64,
}

impl LoginRecord {
    fn lock_elapsed(&self, now: u64) -> bool {
        self.locked_until.is_some_and(|until| now >= until)
    }
}

/// Per-identifier failed login counter with time-boxed lockout.
#[derive(Debug)]
pub struct LoginAttemptGuard {
    records: DashMap<String, LoginRecord>,
    suspicion: Arc<SuspicionTracker>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lockout_ms: u64,
    salt: String,
    capacity: CapacityGuard,
}

impl LoginAttemptGuard {
    pub fn new(config: &LoginConfig, suspicion: Arc<SuspicionTracker>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            suspicion,
            clock,
            max_attempts: config.max_attempts,
            lockout_ms: config.lockout_secs.saturating_mul(1000),
            salt: config.credential_salt.clone(),
            capacity: CapacityGuard::new("login", config.max_entries),
        }
    }

    /// Whether a verification attempt may proceed. An elapsed lockout is
    /// cleared here.
    pub fn check_allowed(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        let elapsed = match self.records.get(identifier) {
            None => return self.has_room(identifier, now),
            Some(record) => match record.locked_until {
                Some(until) if now < until => return false,
                Some(_) => true,
                None => false,
            },
        };

        if elapsed
            && self
                .records
                .remove_if(identifier, |_, record| record.lock_elapsed(now))
                .is_some()
        {
            tracing::info!(identifier, "Login lockout elapsed");
        }
        true
    }

    /// Count a failed attempt. Returns true when this failure started a lockout.
    pub fn record_failure(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        if !self.records.contains_key(identifier) && !self.has_room(identifier, now) {
            return true;
        }

        let (attempts, locked) = {
            let mut record = self
                .records
                .entry(identifier.to_string())
                .or_insert(LoginRecord {
                    attempts: 0,
                    locked_until: None,
                    last_failure: now,
                });
            if record.lock_elapsed(now) {
                record.attempts = 0;
                record.locked_until = None;
            }
            record.attempts += 1;
            record.last_failure = now;
            let locked = record.attempts >= self.max_attempts;
            if locked {
                record.locked_until = Some(now.saturating_add(self.lockout_ms));
            }
            (record.attempts, locked)
        };

        if locked {
            metrics::record_lockout();
            tracing::warn!(identifier, attempts, "Login locked out");
            self.suspicion
                .record_suspicious(identifier, SuspicionKind::MultipleFailedLogins);
        } else {
            tracing::debug!(identifier, attempts, "Failed login recorded");
        }
        locked
    }

    fn has_room(&self, identifier: &str, now: u64) -> bool {
        let admitted = self.capacity.admit(now, || self.records.len(), || self.sweep());
        if !admitted {
            tracing::warn!(identifier, rule = "login_capacity", "Login guard full, refusing untracked identifier");
        }
        admitted
    }

    /// Reset after a successful authentication.
    pub fn clear(&self, identifier: &str) {
        self.records.remove(identifier);
    }

    /// Salted SHA-256 of a credential, hex encoded.
    pub fn hash_credential(&self, candidate: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(candidate.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Compare a candidate against a stored hash in constant time.
    /// Does not consult lockout state; call `check_allowed` first.
    pub fn verify_credential(&self, candidate: &str, reference_hash: &str) -> bool {
        let hashed = self.hash_credential(candidate);
        timing_safe_eq(hashed.as_bytes(), reference_hash.as_bytes())
    }

    /// Run `verify` between the lockout check and the bookkeeping that
    /// follows it.
    pub fn attempt<F>(&self, identifier: &str, verify: F) -> Result<(), LoginError>
    where
        F: FnOnce() -> bool,
    {
        if !self.check_allowed(identifier) {
            tracing::warn!(identifier, rule = "login_lockout", "Login attempt rejected");
            return Err(LoginError::LockedOut);
        }
        self.finish(identifier, verify())
    }

    /// Async form of [`attempt`](Self::attempt) for remote identity providers.
    pub async fn attempt_with<F, Fut>(&self, identifier: &str, verify: F) -> Result<(), LoginError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if !self.check_allowed(identifier) {
            tracing::warn!(identifier, rule = "login_lockout", "Login attempt rejected");
            return Err(LoginError::LockedOut);
        }
        let matched = verify().await;
        self.finish(identifier, matched)
    }

    fn finish(&self, identifier: &str, matched: bool) -> Result<(), LoginError> {
        if matched {
            self.clear(identifier);
            return Ok(());
        }
        if self.record_failure(identifier) {
            Err(LoginError::LockedOut)
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }

    /// Drop records whose lockout elapsed or whose last failure is older
    /// than the lockout duration. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.records.len();
        self.records.retain(|_, record| match record.locked_until {
            Some(until) => now < until,
            None => now.saturating_sub(record.last_failure) <= self.lockout_ms,
        });
        before.saturating_sub(self.records.len())
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of identifiers currently locked out.
    pub fn locked_len(&self) -> usize {
        let now = self.clock.now_ms();
        self.records
            .iter()
            .filter(|r| r.value().locked_until.is_some_and(|until| now < until))
            .count()
    }
}

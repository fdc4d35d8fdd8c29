//! Soft size bound shared by the in-memory security stores.
//!
//! A store at `max_entries` may run one inline sweep per
//! `SWEEP_THROTTLE_MS`. New keys that still do not fit afterwards are
//! refused; what "refused" means is up to the store.

use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum spacing between inline sweeps.
pub const SWEEP_THROTTLE_MS: u64 = 1_000;

#[derive(Debug)]
pub struct CapacityGuard {
    store: &'static str,
    max_entries: usize,
    next_sweep_at: AtomicU64,
}

impl CapacityGuard {
    pub fn new(store: &'static str, max_entries: usize) -> Self {
        Self {
            store,
            max_entries,
            next_sweep_at: AtomicU64::new(0),
        }
    }

    /// Whether a new key may be inserted. `len` reports the current size and
    /// `sweep` evicts expired entries; `sweep` runs at most once per
    /// throttle interval across all callers.
    pub fn admit(&self, now: u64, len: impl Fn() -> usize, sweep: impl FnOnce() -> usize) -> bool {
        if len() < self.max_entries {
            return true;
        }

        let next = self.next_sweep_at.load(Ordering::Acquire);
        if now < next
            || self
                .next_sweep_at
                .compare_exchange(next, now.saturating_add(SWEEP_THROTTLE_MS), Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return false;
        }

        let evicted = sweep();
        let remaining = len();
        tracing::warn!(
            store = self.store,
            evicted,
            remaining,
            max_entries = self.max_entries,
            "Store at capacity, swept expired entries"
        );
        remaining < self.max_entries
    }
}

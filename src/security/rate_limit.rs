//! Fixed-window rate limiting keyed by arbitrary identifiers.
//!
//! # Design Decisions
//! - Fixed window, not sliding: O(1) per check, bursts at a window boundary
//!   are accepted (up to `2 * limit` across two adjacent windows)
//! - Windows are created lazily and only removed by `sweep`
//! - At capacity a new identifier is refused (fail closed) unless a
//!   throttled sweep frees room
//! - Read-modify-write happens under the DashMap shard lock for the key, so
//!   concurrent requests from one identifier never under-count

use std::sync::Arc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::security::capacity::CapacityGuard;
use crate::security::clock::Clock;

/// Counter for one identifier within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateWindow {
    count: u32,
    reset_at: u64,
}

/// Fixed-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    clock: Arc<dyn Clock>,
    capacity: CapacityGuard,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
            capacity: CapacityGuard::new("rate_limit", max_entries),
        }
    }

    /// Record one hit for `identifier`. Returns false once `limit` hits have
    /// been seen in the current window.
    pub fn allow(&self, identifier: &str, limit: u32, window_ms: u64) -> bool {
        let now = self.clock.now_ms();
        if !self.windows.contains_key(identifier)
            && !self.capacity.admit(now, || self.windows.len(), || self.sweep())
        {
            tracing::debug!(identifier, "Rate limiter full, refusing new identifier");
            return false;
        }

        match self.windows.entry(identifier.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateWindow {
                    count: 1,
                    reset_at: now.saturating_add(window_ms),
                });
                true
            }
            Entry::Occupied(mut slot) => {
                let window = slot.get_mut();
                if now > window.reset_at {
                    window.count = 1;
                    window.reset_at = now.saturating_add(window_ms);
                    true
                } else if window.count < limit {
                    window.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop windows whose reset time has passed. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.reset_at);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

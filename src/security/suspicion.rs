//! Suspicious activity tracking and the blocked set.
//!
//! # State Transitions
//! ```text
//! Tracked (count < threshold) → Blocked: count reaches threshold
//! Blocked → removed: admin unblock, block TTL elapsed (if configured), restart
//! ```
//!
//! Blocking is permanent for the process lifetime unless a block TTL is
//! configured. Unlike login lockouts, blocks are consulted before any other
//! rule.

use std::sync::Arc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::SuspicionConfig;
use crate::observability::metrics;
use crate::security::capacity::CapacityGuard;
use crate::security::clock::Clock;

/// What triggered a suspicion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspicionKind {
    SuspiciousUserAgent,
    SuspiciousUrl,
    RateLimitExceeded,
    MultipleFailedLogins,
}

impl SuspicionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspicionKind::SuspiciousUserAgent => "SUSPICIOUS_USER_AGENT",
            SuspicionKind::SuspiciousUrl => "SUSPICIOUS_URL",
            SuspicionKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            SuspicionKind::MultipleFailedLogins => "MULTIPLE_FAILED_LOGINS",
        }
    }
}

impl std::fmt::Display for SuspicionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct SuspicionRecord {
    count: u32,
    last_seen: u64,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    blocked_at: u64,
    expires_at: Option<u64>,
}

impl Block {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A blocked identifier as reported to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedEntry {
    pub identifier: String,
    pub blocked_for_secs: u64,
    pub expires_in_secs: Option<u64>,
}

/// Per-identifier suspicion counters feeding a blocked set.
#[derive(Debug)]
pub struct SuspicionTracker {
    records: DashMap<String, SuspicionRecord>,
    blocked: DashMap<String, Block>,
    clock: Arc<dyn Clock>,
    threshold: u32,
    block_ttl_ms: Option<u64>,
    retention_ms: u64,
    capacity: CapacityGuard,
}

impl SuspicionTracker {
    pub fn new(config: &SuspicionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            blocked: DashMap::new(),
            clock,
            threshold: config.threshold,
            block_ttl_ms: config.block_ttl_secs.map(|s| s.saturating_mul(1000)),
            retention_ms: config.retention_secs.saturating_mul(1000),
            capacity: CapacityGuard::new("suspicion", config.max_entries),
        }
    }

    /// Count one suspicious event. Returns true when this event moved the
    /// identifier into the blocked set. New identifiers are not tracked while
    /// the tracker is full.
    pub fn record_suspicious(&self, identifier: &str, kind: SuspicionKind) -> bool {
        let now = self.clock.now_ms();
        metrics::record_suspicious(kind.as_str());

        if !self.records.contains_key(identifier)
            && !self.capacity.admit(now, || self.records.len(), || self.sweep())
        {
            tracing::debug!(identifier, kind = %kind, "Suspicion tracker full, event not recorded");
            return false;
        }

        let count = {
            let mut record = self
                .records
                .entry(identifier.to_string())
                .or_insert(SuspicionRecord { count: 0, last_seen: now });
            record.count += 1;
            record.last_seen = now;
            record.count
        };

        tracing::warn!(identifier, kind = %kind, count, "Suspicious activity");

        if count < self.threshold {
            return false;
        }

        match self.blocked.entry(identifier.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Block {
                    blocked_at: now,
                    expires_at: self.block_ttl_ms.map(|ttl| now.saturating_add(ttl)),
                });
                metrics::record_blocked();
                tracing::warn!(identifier, count, ttl_ms = ?self.block_ttl_ms, "Identifier blocked");
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Whether `identifier` is currently blocked. Expired blocks are lifted
    /// as a side effect.
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        if self
            .blocked
            .remove_if(identifier, |_, block| block.is_expired(now))
            .is_some()
        {
            self.records.remove(identifier);
            tracing::info!(identifier, "Block expired");
            return false;
        }
        self.blocked.contains_key(identifier)
    }

    /// Lift a block and forget the identifier's history.
    pub fn unblock(&self, identifier: &str) -> bool {
        self.records.remove(identifier);
        let removed = self.blocked.remove(identifier).is_some();
        if removed {
            tracing::info!(identifier, "Identifier unblocked");
        }
        removed
    }

    /// Current suspicion count for an identifier.
    pub fn count(&self, identifier: &str) -> u32 {
        self.records.get(identifier).map(|r| r.count).unwrap_or(0)
    }

    /// Snapshot of the blocked set.
    pub fn blocked(&self) -> Vec<BlockedEntry> {
        let now = self.clock.now_ms();
        let mut entries: Vec<_> = self
            .blocked
            .iter()
            .filter(|r| !r.value().is_expired(now))
            .map(|r| BlockedEntry {
                identifier: r.key().clone(),
                blocked_for_secs: now.saturating_sub(r.value().blocked_at) / 1000,
                expires_in_secs: r.value().expires_at.map(|at| at.saturating_sub(now) / 1000),
            })
            .collect();
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        entries
    }

    /// Lift expired blocks and drop idle records of unblocked identifiers.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();

        let blocks_before = self.blocked.len();
        self.blocked.retain(|_, block| !block.is_expired(now));
        let lifted = blocks_before.saturating_sub(self.blocked.len());

        let records_before = self.records.len();
        self.records.retain(|identifier, record| {
            self.blocked.contains_key(identifier)
                || now.saturating_sub(record.last_seen) <= self.retention_ms
        });
        lifted + records_before.saturating_sub(self.records.len())
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of blocked identifiers.
    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn tracker(config: SuspicionConfig) -> (Arc<ManualClock>, SuspicionTracker) {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = SuspicionTracker::new(&config, clock.clone());
        (clock, tracker)
    }

    #[test]
    fn test_escalation_threshold() {
        let (_, tracker) = tracker(SuspicionConfig::default());
        let kinds = [
            SuspicionKind::SuspiciousUserAgent,
            SuspicionKind::SuspiciousUrl,
            SuspicionKind::RateLimitExceeded,
            SuspicionKind::MultipleFailedLogins,
        ];
        for kind in kinds {
            assert!(!tracker.record_suspicious("1.2.3.4", kind));
        }
        assert!(!tracker.is_blocked("1.2.3.4"));

        assert!(tracker.record_suspicious("1.2.3.4", SuspicionKind::SuspiciousUrl));
        assert!(tracker.is_blocked("1.2.3.4"));
        assert!(!tracker.is_blocked("5.6.7.8"));

        // Further events do not re-block
        assert!(!tracker.record_suspicious("1.2.3.4", SuspicionKind::SuspiciousUrl));
        assert_eq!(tracker.count("1.2.3.4"), 6);
    }

    #[test]
    fn test_block_is_permanent_by_default() {
        let (clock, tracker) = tracker(SuspicionConfig::default());
        for _ in 0..5 {
            tracker.record_suspicious("ip", SuspicionKind::SuspiciousUrl);
        }
        clock.advance(365 * 24 * 3600 * 1000);
        tracker.sweep();
        assert!(tracker.is_blocked("ip"));
    }

    #[test]
    fn test_block_ttl_expires() {
        let config = SuspicionConfig {
            block_ttl_secs: Some(60),
            ..SuspicionConfig::default()
        };
        let (clock, tracker) = tracker(config);
        for _ in 0..5 {
            tracker.record_suspicious("ip", SuspicionKind::SuspiciousUrl);
        }
        clock.advance(59_999);
        assert!(tracker.is_blocked("ip"));

        clock.advance(1);
        assert!(!tracker.is_blocked("ip"));
        assert_eq!(tracker.count("ip"), 0);
    }

    #[test]
    fn test_unblock() {
        let (_, tracker) = tracker(SuspicionConfig::default());
        for _ in 0..5 {
            tracker.record_suspicious("ip", SuspicionKind::RateLimitExceeded);
        }
        assert_eq!(tracker.blocked().len(), 1);

        assert!(tracker.unblock("ip"));
        assert!(!tracker.is_blocked("ip"));
        assert!(!tracker.unblock("ip"));

        // History was reset: four more events are not enough.
        for _ in 0..4 {
            tracker.record_suspicious("ip", SuspicionKind::RateLimitExceeded);
        }
        assert!(!tracker.is_blocked("ip"));
    }

    #[test]
    fn test_sweep_keeps_blocked_records() {
        let config = SuspicionConfig {
            retention_secs: 10,
            ..SuspicionConfig::default()
        };
        let (clock, tracker) = tracker(config);
        tracker.record_suspicious("idle", SuspicionKind::SuspiciousUrl);
        for _ in 0..5 {
            tracker.record_suspicious("bad", SuspicionKind::SuspiciousUrl);
        }

        clock.advance(10_001);
        assert_eq!(tracker.sweep(), 1);
        assert_eq!(tracker.count("idle"), 0);
        assert_eq!(tracker.count("bad"), 5);
        assert!(tracker.is_blocked("bad"));
    }

    #[test]
    fn test_full_tracker_keeps_counting_known_identifiers() {
        let config = SuspicionConfig {
            max_entries: 1,
            ..SuspicionConfig::default()
        };
        let (_, tracker) = tracker(config);
        tracker.record_suspicious("known", SuspicionKind::SuspiciousUrl);

        assert!(!tracker.record_suspicious("new", SuspicionKind::SuspiciousUrl));
        assert_eq!(tracker.count("new"), 0);

        for _ in 0..4 {
            tracker.record_suspicious("known", SuspicionKind::SuspiciousUrl);
        }
        assert!(tracker.is_blocked("known"));
    }

    #[test]
    fn test_huge_block_ttl_does_not_overflow() {
        let config = SuspicionConfig {
            block_ttl_secs: Some(u64::MAX),
            ..SuspicionConfig::default()
        };
        let (clock, tracker) = tracker(config);
        clock.set(1_000);
        for _ in 0..5 {
            tracker.record_suspicious("ip", SuspicionKind::SuspiciousUrl);
        }
        assert!(tracker.is_blocked("ip"));
    }
}

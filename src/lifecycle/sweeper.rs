//! Periodic eviction of expired security state.
//!
//! One task per process. Each tick sweeps every store in turn; the stores
//! lock one DashMap shard at a time, so request handling is never stalled
//! behind a full-map scan.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::security::SecurityCore;

pub struct Sweeper {
    core: SecurityCore,
    interval: Duration,
}

impl Sweeper {
    pub fn new(core: SecurityCore, interval: Duration) -> Self {
        Self { core, interval }
    }

    /// Sweep on every tick until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.core.sweep();
                    tracing::debug!(evicted, "Sweep complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper stopped");
                    return;
                }
            }
        }
    }
}

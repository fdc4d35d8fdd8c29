//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_rejections_total` (counter): rejected requests by rule
//! - `gate_suspicious_events_total` (counter): suspicion signals by kind
//! - `gate_blocked_identifiers_total` (counter): identifiers moved into the blocked set
//! - `gate_login_lockouts_total` (counter): lockouts started
//! - `gate_csrf_tokens_issued_total` (counter): tokens handed out
//! - `gate_sweep_evictions_total` (counter): entries removed by sweeps, by store
//! - `gate_tracked_identifiers` (gauge): live entries per store after a sweep
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rejection(rule: &'static str) {
    counter!("gate_rejections_total", "rule" => rule).increment(1);
}

pub fn record_suspicious(kind: &'static str) {
    counter!("gate_suspicious_events_total", "kind" => kind).increment(1);
}

pub fn record_blocked() {
    counter!("gate_blocked_identifiers_total").increment(1);
}

pub fn record_lockout() {
    counter!("gate_login_lockouts_total").increment(1);
}

pub fn record_csrf_issued() {
    counter!("gate_csrf_tokens_issued_total").increment(1);
}

pub fn record_sweep(store: &'static str, evicted: usize, remaining: usize) {
    counter!("gate_sweep_evictions_total", "store" => store).increment(evicted as u64);
    gauge!("gate_tracked_identifiers", "store" => store).set(remaining as f64);
}

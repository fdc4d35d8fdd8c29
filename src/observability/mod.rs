//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Security components produce:
//!     → logging.rs (structured events: identifier, rule, kind)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

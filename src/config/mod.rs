//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → GATE_* environment overrides
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → handed to each component at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, CsrfConfig, EdgeGateConfig, GateConfig, ListenerConfig, LoginConfig,
    ObservabilityConfig, RateLimitConfig, StorageConfig, SuspicionConfig, UpstreamConfig,
};

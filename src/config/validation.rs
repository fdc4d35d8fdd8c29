//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, durations within
//!   `1..=MAX_DURATION_SECS`, addresses parse)
//! - Refuse to start without a storage passphrase
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GateConfig, PLACEHOLDER_ADMIN_KEY};

/// Upper bound for every configured duration: ten years.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_addr(&mut errors, "upstream.address", &config.upstream.address);
    check_secs(&mut errors, "listener.request_timeout_secs", config.listener.request_timeout_secs);

    check_prefix(&mut errors, "gate.admin_prefix", &config.gate.admin_prefix);
    check_prefix(&mut errors, "gate.api_prefix", &config.gate.api_prefix);
    if !matches!(config.gate.default_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new("gate.default_scheme", "must be \"http\" or \"https\""));
    }

    if config.rate_limit.api_limit == 0 {
        errors.push(ValidationError::new("rate_limit.api_limit", "must be greater than 0"));
    }
    let window_ms = config.rate_limit.api_window_ms;
    if window_ms == 0 || window_ms > MAX_DURATION_SECS * 1000 {
        errors.push(ValidationError::new(
            "rate_limit.api_window_ms",
            format!("must be between 1 and {}", MAX_DURATION_SECS * 1000),
        ));
    }

    if config.suspicion.threshold == 0 {
        errors.push(ValidationError::new("suspicion.threshold", "must be greater than 0"));
    }
    if let Some(ttl) = config.suspicion.block_ttl_secs {
        check_secs(&mut errors, "suspicion.block_ttl_secs", ttl);
    }
    if config.suspicion.retention_secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            "suspicion.retention_secs",
            format!("must be at most {}", MAX_DURATION_SECS),
        ));
    }

    if config.login.max_attempts == 0 {
        errors.push(ValidationError::new("login.max_attempts", "must be greater than 0"));
    }
    check_secs(&mut errors, "login.lockout_secs", config.login.lockout_secs);

    check_secs(&mut errors, "csrf.ttl_secs", config.csrf.ttl_secs);
    check_secs(&mut errors, "csrf.sweep_interval_secs", config.csrf.sweep_interval_secs);

    if config.storage.passphrase.is_empty() {
        errors.push(ValidationError::new(
            "storage.passphrase",
            "missing (set GATE_STORAGE_PASSPHRASE)",
        ));
    }
    if config.storage.pbkdf2_rounds == 0 {
        errors.push(ValidationError::new("storage.pbkdf2_rounds", "must be greater than 0"));
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address {:?}", value)));
    }
}

fn check_secs(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 || value > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            field,
            format!("must be between 1 and {}", MAX_DURATION_SECS),
        ));
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::new(field, "must start with '/'"));
    }
}

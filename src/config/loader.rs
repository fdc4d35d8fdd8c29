//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "GATE_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a configuration: TOML file (optional), then `GATE_*` environment
/// overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<GateConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GateConfig::default(),
    };

    apply_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `GATE_*` key/value overrides. Unknown keys are ignored.
pub fn apply_overrides<I, K, V>(config: &mut GateConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    for (key, value) in vars {
        let key = key.as_ref();
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let value: String = value.into();

        match name {
            "BIND_ADDRESS" => config.listener.bind_address = value,
            "UPSTREAM_ADDRESS" => config.upstream.address = value,
            "STORAGE_PASSPHRASE" => config.storage.passphrase = value,
            "ADMIN_API_KEY" => config.admin.api_key = value,
            "LOG_LEVEL" => config.observability.log_level = value,
            "API_RATE_LIMIT" => config.rate_limit.api_limit = parse(key, &value)?,
            "API_RATE_WINDOW_MS" => config.rate_limit.api_window_ms = parse(key, &value)?,
            "LOGIN_MAX_ATTEMPTS" => config.login.max_attempts = parse(key, &value)?,
            "LOCKOUT_SECS" => config.login.lockout_secs = parse(key, &value)?,
            "SUSPICION_THRESHOLD" => config.suspicion.threshold = parse(key, &value)?,
            "BLOCK_TTL_SECS" => config.suspicion.block_ttl_secs = Some(parse(key, &value)?),
            "CSRF_TTL_SECS" => config.csrf.ttl_secs = parse(key, &value)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

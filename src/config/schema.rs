//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder admin key shipped in defaults. Validation refuses it when the
/// admin listener is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the security gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream application the gate forwards admitted requests to.
    pub upstream: UpstreamConfig,

    /// Per-request interceptor rules.
    pub gate: EdgeGateConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Suspicious activity tracking and blocking.
    pub suspicion: SuspicionConfig,

    /// Failed login tracking and lockout.
    pub login: LoginConfig,

    /// CSRF token issuance.
    pub csrf: CsrfConfig,

    /// Encrypted client-side storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Maximum request body forwarded upstream, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Edge interceptor rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeGateConfig {
    /// Prefix of administrative pages that require a same-origin referer.
    pub admin_prefix: String,

    /// Prefix of API routes subject to rate limiting and JSON enforcement.
    pub api_prefix: String,

    /// Case-insensitive user-agent substrings that are refused outright.
    pub blocked_user_agents: Vec<String>,

    /// Case-insensitive substrings that mark a decoded path as an injection attempt.
    pub blocked_url_patterns: Vec<String>,

    /// Resolve the client IP from `X-Forwarded-For` / `X-Real-IP`. Only
    /// enable behind a proxy that overwrites these headers; otherwise any
    /// client can pick its own identifier.
    pub trust_forwarded_for: bool,

    /// Scheme assumed for the request origin when `X-Forwarded-Proto` is absent.
    pub default_scheme: String,

    /// Attach the security header set to admitted responses.
    pub enable_headers: bool,

    /// HSTS max-age in seconds.
    pub hsts_max_age_secs: u64,

    /// External origins allowed in the CSP `script-src` directive.
    pub script_src: Vec<String>,

    /// External origins allowed in the CSP `connect-src` directive.
    pub connect_src: Vec<String>,
}

impl Default for EdgeGateConfig {
    fn default() -> Self {
        Self {
            admin_prefix: "/admin".to_string(),
            api_prefix: "/api".to_string(),
            blocked_user_agents: ["bot", "crawler", "spider", "scraper", "hack", "scan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blocked_url_patterns: [
                "union",
                "select",
                "insert",
                "delete",
                "drop",
                "exec",
                "script",
                "javascript:",
                "vbscript:",
                "onload",
                "onerror",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            trust_forwarded_for: false,
            default_scheme: "https".to_string(),
            enable_headers: true,
            hsts_max_age_secs: 31_536_000,
            script_src: vec![
                "https://apis.google.com".to_string(),
                "https://www.gstatic.com".to_string(),
            ],
            connect_src: vec![
                "https://identitytoolkit.googleapis.com".to_string(),
                "https://securetoken.googleapis.com".to_string(),
                "https://firestore.googleapis.com".to_string(),
                "wss://firestore.googleapis.com".to_string(),
            ],
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window for API routes, per client IP.
    pub api_limit: u32,

    /// Window length in milliseconds.
    pub api_window_ms: u64,

    /// Soft bound on tracked windows before an inline sweep.
    pub max_entries: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_limit: 50,
            api_window_ms: 60_000,
            max_entries: 100_000,
        }
    }
}

/// Suspicious activity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SuspicionConfig {
    /// Suspicious events before an identifier is blocked.
    pub threshold: u32,

    /// Block duration in seconds. `None` blocks for the process lifetime.
    pub block_ttl_secs: Option<u64>,

    /// Idle time after which an unblocked suspicion record is swept.
    pub retention_secs: u64,

    /// Soft bound on tracked identifiers before an inline sweep.
    pub max_entries: usize,
}

impl Default for SuspicionConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            block_ttl_secs: None,
            retention_secs: 24 * 3600,
            max_entries: 100_000,
        }
    }
}

/// Login attempt configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Failures before the identifier is locked out.
    pub max_attempts: u32,

    /// Lockout duration in seconds.
    pub lockout_secs: u64,

    /// Salt mixed into candidate credentials before hashing.
    pub credential_salt: String,

    /// Soft bound on tracked identifiers before an inline sweep.
    pub max_entries: usize,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lockout_secs: 15 * 60,
            credential_salt: "reagent-gate.credential".to_string(),
            max_entries: 100_000,
        }
    }
}

/// CSRF token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Token lifetime in seconds.
    pub ttl_secs: u64,

    /// Interval of the background sweep over every store, in seconds.
    pub sweep_interval_secs: u64,

    /// Consume tokens on successful validation.
    pub single_use: bool,

    /// Soft bound on live tokens before an inline sweep.
    pub max_entries: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 300,
            single_use: false,
            max_entries: 100_000,
        }
    }
}

/// Encrypted storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Passphrase the storage key is derived from. Normally supplied via
    /// `GATE_STORAGE_PASSPHRASE`; never serialized back out.
    #[serde(skip_serializing)]
    pub passphrase: String,

    /// Salt for the PBKDF2 key derivation.
    pub key_salt: String,

    /// PBKDF2 iteration count.
    pub pbkdf2_rounds: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            key_salt: "reagent-gate.secure-storage".to_string(),
            pbkdf2_rounds: 100_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

//! Per-request admission decisions.
//!
//! # Pipeline
//! ```text
//! RequestMeta
//!     → blocklist            (403)
//!     → user-agent heuristic (403, suspicion)
//!     → admin referer check  (redirect to /)
//!     → API rate limit       (429, suspicion)
//!     → API JSON enforcement (400)
//!     → URL heuristic        (400, suspicion)
//!     → Allow (security headers stamped on the response)
//! ```
//!
//! The first failing rule decides. Decisions depend only on the request
//! attributes, the limiter/tracker state and the clock; nothing here
//! performs I/O.

use std::sync::Arc;
use axum::http::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::{EdgeGateConfig, RateLimitConfig};
use crate::observability::metrics;
use crate::security::headers::SecurityHeaders;
use crate::security::rate_limit::RateLimiter;
use crate::security::suspicion::{SuspicionKind, SuspicionTracker};

/// Request attributes the gate decides on.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Resolved client IP, or `"unknown"`.
    pub client_ip: String,
    pub method: Method,
    /// Raw (still percent-encoded) path.
    pub path: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// The request's own origin, `scheme://host[:port]`.
    pub origin: Option<String>,
    pub content_type: Option<String>,
}

/// The rule that produced a non-allow verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRule {
    Blocklist,
    UserAgent,
    AdminReferer,
    ApiRateLimit,
    ContentType,
    UrlPattern,
}

impl GateRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateRule::Blocklist => "blocklist",
            GateRule::UserAgent => "user_agent",
            GateRule::AdminReferer => "admin_referer",
            GateRule::ApiRateLimit => "api_rate_limit",
            GateRule::ContentType => "content_type",
            GateRule::UrlPattern => "url_pattern",
        }
    }

    /// Plain-text response body for a rejection.
    pub fn message(&self) -> &'static str {
        match self {
            GateRule::Blocklist | GateRule::UserAgent => "Access denied",
            GateRule::AdminReferer => "Redirecting",
            GateRule::ApiRateLimit => "Too many requests",
            GateRule::ContentType => "Invalid content type",
            GateRule::UrlPattern => "Invalid request",
        }
    }
}

impl std::fmt::Display for GateRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`EdgeGate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Redirect { location: String, rule: GateRule },
    Reject { status: StatusCode, rule: GateRule },
}

/// The request interceptor.
#[derive(Debug)]
pub struct EdgeGate {
    config: EdgeGateConfig,
    admin_prefix: String,
    api_prefix: String,
    api_limit: u32,
    api_window_ms: u64,
    blocked_user_agents: Vec<String>,
    blocked_url_patterns: Vec<String>,
    limiter: Arc<RateLimiter>,
    suspicion: Arc<SuspicionTracker>,
    headers: SecurityHeaders,
}

impl EdgeGate {
    pub fn new(
        config: &EdgeGateConfig,
        rate_limit: &RateLimitConfig,
        limiter: Arc<RateLimiter>,
        suspicion: Arc<SuspicionTracker>,
    ) -> Self {
        let lowercase = |list: &[String]| -> Vec<String> { list.iter().map(|s| s.to_lowercase()).collect() };
        Self {
            config: config.clone(),
            admin_prefix: config.admin_prefix.to_lowercase(),
            api_prefix: config.api_prefix.to_lowercase(),
            api_limit: rate_limit.api_limit,
            api_window_ms: rate_limit.api_window_ms,
            blocked_user_agents: lowercase(&config.blocked_user_agents),
            blocked_url_patterns: lowercase(&config.blocked_url_patterns),
            limiter,
            suspicion,
            headers: SecurityHeaders::from_config(config),
        }
    }

    pub fn config(&self) -> &EdgeGateConfig {
        &self.config
    }

    /// Security headers for admitted responses, if enabled.
    pub fn headers(&self) -> Option<&SecurityHeaders> {
        self.config.enable_headers.then_some(&self.headers)
    }

    /// Decide whether `request` may proceed.
    pub fn evaluate(&self, request: &RequestMeta) -> Verdict {
        let ip = request.client_ip.as_str();

        if self.suspicion.is_blocked(ip) {
            return self.reject(request, StatusCode::FORBIDDEN, GateRule::Blocklist);
        }

        if let Some(agent) = request.user_agent.as_deref() {
            let agent = agent.to_lowercase();
            if self.blocked_user_agents.iter().any(|p| agent.contains(p.as_str())) {
                self.suspicion
                    .record_suspicious(ip, SuspicionKind::SuspiciousUserAgent);
                return self.reject(request, StatusCode::FORBIDDEN, GateRule::UserAgent);
            }
        }

        // Every path rule sees the decoded, lowercased form
        let path = percent_decode_str(&request.path)
            .decode_utf8_lossy()
            .to_lowercase();

        if path.starts_with(&self.admin_prefix) && !self.same_origin_referer(request) {
            metrics::record_rejection(GateRule::AdminReferer.as_str());
            tracing::warn!(
                identifier = ip,
                rule = %GateRule::AdminReferer,
                path = %request.path,
                "Admin request without same-origin referer, redirecting"
            );
            return Verdict::Redirect {
                location: "/".to_string(),
                rule: GateRule::AdminReferer,
            };
        }

        let is_api = path.starts_with(&self.api_prefix);
        if is_api {
            let key = format!("{}-api", ip);
            if !self.limiter.allow(&key, self.api_limit, self.api_window_ms) {
                self.suspicion
                    .record_suspicious(ip, SuspicionKind::RateLimitExceeded);
                return self.reject(request, StatusCode::TOO_MANY_REQUESTS, GateRule::ApiRateLimit);
            }

            if request.method == Method::POST && !is_json(request.content_type.as_deref()) {
                return self.reject(request, StatusCode::BAD_REQUEST, GateRule::ContentType);
            }
        }

        if self.blocked_url_patterns.iter().any(|p| path.contains(p.as_str())) {
            self.suspicion.record_suspicious(ip, SuspicionKind::SuspiciousUrl);
            return self.reject(request, StatusCode::BAD_REQUEST, GateRule::UrlPattern);
        }

        Verdict::Allow
    }

    fn same_origin_referer(&self, request: &RequestMeta) -> bool {
        let (Some(referer), Some(origin)) = (request.referer.as_deref(), request.origin.as_deref()) else {
            return false;
        };
        match Url::parse(referer) {
            Ok(url) => url.origin().ascii_serialization().eq_ignore_ascii_case(origin),
            Err(_) => false,
        }
    }

    fn reject(&self, request: &RequestMeta, status: StatusCode, rule: GateRule) -> Verdict {
        metrics::record_rejection(rule.as_str());
        tracing::warn!(
            identifier = %request.client_ip,
            rule = %rule,
            status = status.as_u16(),
            method = %request.method,
            path = %request.path,
            "Request rejected"
        );
        Verdict::Reject { status, rule }
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

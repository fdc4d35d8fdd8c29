//! Security response headers.
//!
//! # Design Decisions
//! - Header values are built once from config and copied onto each response
//! - Existing upstream values are overwritten; the gate's policy wins
//! - The CSP allow-lists the identity and data-service origins the
//!   application talks to, nothing else

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::EdgeGateConfig;

/// Precomputed header set stamped on admitted responses.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn from_config(config: &EdgeGateConfig) -> Self {
        let csp = content_security_policy(&config.script_src, &config.connect_src);
        let hsts = format!("max-age={}; includeSubDomains; preload", config.hsts_max_age_secs);

        let pairs: [(&'static str, String); 9] = [
            ("x-frame-options", "DENY".into()),
            ("x-content-type-options", "nosniff".into()),
            ("x-xss-protection", "1; mode=block".into()),
            ("referrer-policy", "strict-origin-when-cross-origin".into()),
            ("permissions-policy", "camera=(), microphone=(), geolocation=()".into()),
            ("strict-transport-security", hsts),
            ("cross-origin-opener-policy", "same-origin".into()),
            ("cross-origin-resource-policy", "same-origin".into()),
            ("content-security-policy", csp),
        ];

        let headers = pairs
            .into_iter()
            .filter_map(|(name, value)| match HeaderValue::from_str(&value) {
                Ok(value) => Some((HeaderName::from_static(name), value)),
                Err(_) => {
                    tracing::error!(header = name, "Dropping security header with invalid value");
                    None
                }
            })
            .collect();

        Self { headers }
    }

    /// Insert every header, replacing existing values.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }
}

fn content_security_policy(script_src: &[String], connect_src: &[String]) -> String {
    let with_self = |origins: &[String]| {
        std::iter::once("'self'")
            .chain(origins.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    };

    [
        "default-src 'self'".to_string(),
        format!("script-src {}", with_self(script_src)),
        "style-src 'self' 'unsafe-inline'".to_string(),
        "img-src 'self' data: https:".to_string(),
        "font-src 'self' data:".to_string(),
        format!("connect-src {}", with_self(connect_src)),
        "frame-ancestors 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
    ]
    .join("; ")
}

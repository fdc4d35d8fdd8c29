//! Stateless input escaping and allow-list validation.

use std::sync::LazyLock;
use regex::Regex;
use serde::Deserialize;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

static TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9\s\x{0600}-\x{06FF}._\-]+$").expect("text pattern")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("number pattern"));

/// Declared type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Email,
    Text,
    Number,
}

/// Escape `< > " ' /` as HTML entities.
///
/// `&` is left alone, so existing entities pass through untouched. Escape
/// once at the trust boundary; nothing here detects already-escaped input.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            c => out.push(c),
        }
    }
    out
}

/// Check `input` against the allow-list for `kind`. Empty input never passes.
pub fn validate(input: &str, kind: InputKind) -> bool {
    let pattern = match kind {
        InputKind::Email => &*EMAIL,
        InputKind::Text => &*TEXT,
        InputKind::Number => &*NUMBER,
    };
    pattern.is_match(input)
}

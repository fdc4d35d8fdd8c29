//! Edge security gate library.
//!
//! Sits in front of a web application and screens every request before it
//! is forwarded: blocklisted clients, scraper user agents, probing URLs,
//! API rate limits and request content types. Also provides the building
//! blocks an application uses behind the gate: login lockout, CSRF tokens,
//! encrypted client-side storage and input validation.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::SecurityCore;

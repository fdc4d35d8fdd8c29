//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/edge_gate.rs (admit, redirect or reject)
//!     → request.rs (client IP, origin, gate inputs)
//!     → server.rs (built-in endpoints or forward upstream)
//!     → security headers stamped on the way out
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use server::{AppState, HttpServer, CSRF_TOKEN_PATH};

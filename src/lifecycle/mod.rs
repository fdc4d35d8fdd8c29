//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build SecurityCore → Spawn sweeper → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → listeners drain, sweeper exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

pub mod shutdown;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use sweeper::Sweeper;

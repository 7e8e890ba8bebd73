//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Probe store → Spawn watcher → Run orchestrator
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast request → Orchestrator exits at next idle point
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then store, then background tasks
//! - A cycle in progress is never interrupted; shutdown waits for it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{verify_store, StartupError};

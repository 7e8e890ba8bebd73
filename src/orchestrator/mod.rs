//! Rebuild orchestration.
//!
//! # Responsibilities
//! - Run one reconcile cycle at startup
//! - Rebuild after every burst of changes, once the burst has settled
//! - Stop cleanly on shutdown
//!
//! # Data Flow
//! ```text
//!            ┌──────────────┐  change   ┌──────────┐
//! start ──→  │ Reconciling  │ ───────→  │ Waiting  │ ──→ shutdown: return Ok
//!            └──────────────┘           └──────────┘
//!                   ↑                         │ signal
//!                   │      ┌──────────┐       │
//!                   └───── │ Cooldown │ ←─────┘
//!                          └──────────┘
//! ```
//!
//! # Design Decisions
//! - Strictly sequential: one cycle at a time, never overlapping
//! - The pending signal is drained when a cycle starts, so changes made
//!   during the cooldown do not trigger a second redundant cycle
//! - An unreadable registry stops the process; a failed reconcile only
//!   ends the cycle and waits for the next change

pub mod runner;

pub use runner::{Orchestrator, OrchestratorError};

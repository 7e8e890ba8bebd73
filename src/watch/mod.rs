//! Change detection subsystem.
//!
//! # Data Flow
//! ```text
//! store mutation under services_root
//!     → watcher.rs (long-lived subscription)
//!     → signal.rs ChangeNotifier::notify() (non-blocking, single slot)
//!     → ChangeSignal::wait() in the orchestrator
//! ```
//!
//! # Design Decisions
//! - The signal carries no data: the orchestrator only needs "something changed"
//! - A full slot drops the event, so bursts collapse into one signal
//! - Watch failures are retried after a fixed interval, never fatal

pub mod signal;
pub mod watcher;

pub use signal::{change_channel, ChangeNotifier, ChangeSignal, Notify};
pub use watcher::ChangeWatcher;

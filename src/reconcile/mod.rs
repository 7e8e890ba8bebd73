//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! DesiredState
//!     → encode.rs (flat key → JSON map, NewConf)
//! store.get(proxy_root, recursive)
//!     → Snapshot (Existing)
//! plan.rs (layout.rs decides ownership of every key)
//!     → deletes: frontends, then backends
//!     → upserts: backends, then frontend records, then middlewares
//! reconciler.rs
//!     → apply deletes, apply upserts, prune empty entity directories
//!     → ReconcileReport
//! ```
//!
//! # Design Decisions
//! - Only `frontends/fe:*` and `backends/b:*` are owned; everything else is foreign
//! - Write ordering replaces transactions: a frontend never points at a
//!   missing backend and a middleware never precedes its frontend
//! - Idempotent: unchanged values are never rewritten

pub mod encode;
pub mod layout;
pub mod plan;
pub mod reconciler;

pub use layout::{KeyClass, ProxyLayout};
pub use plan::Plan;
pub use reconciler::{ReconcileError, ReconcileReport, Reconciler};

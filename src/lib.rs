//! Vulcan Config Builder Library
//!
//! Keeps a vulcand proxy configuration tree in etcd in step with the
//! services declared under a separate etcd prefix.

// Input
pub mod registry;
pub mod store;

// Core pipeline
pub mod builder;
pub mod reconcile;

// Change detection and scheduling
pub mod orchestrator;
pub mod watch;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use builder::{build, DesiredState};
pub use config::Config;
pub use lifecycle::Shutdown;
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use reconcile::{ReconcileReport, Reconciler};
pub use registry::{read_services, Service};
pub use store::{EtcdStore, KeyValueStore, MemoryStore};

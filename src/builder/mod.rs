//! Proxy configuration builder.
//!
//! # Data Flow
//! ```text
//! Vec<Service>
//!     → config_builder.rs (per service: backends, then frontends)
//!         address.rs drops addresses that are not host:port
//!     → DesiredState (model.rs)
//!     → reconcile
//! ```
//!
//! # Generated objects (service `S`)
//! ```text
//! b:S                  every valid address of S
//! b:S:ID               one per address entry
//! fe:byhost:S          Host(`S`)                      → b:S
//! fe:health:S:ID       /health/S-ID/__health          → b:S:ID   (healthcheck only)
//! fe:internal:S        /__S/*                         → b:S
//! fe:S:path:P          path-regex P [+ path-host P]   → b:S
//! ```
//!
//! # Design Decisions
//! - Pure function, no I/O: equal inputs give equal outputs
//! - Invalid input is skipped with a warning, never fatal

pub mod address;
pub mod config_builder;
pub mod model;

pub use config_builder::build;
pub use model::{Backend, DesiredState, Frontend, RewriteRule};

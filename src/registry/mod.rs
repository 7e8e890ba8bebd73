//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! {services_root}/{name}/...  (declarative tree in the store)
//!     → reader.rs (one recursive get, structural checks)
//!     → Vec<Service> (service.rs)
//!     → builder
//! ```
//!
//! # Design Decisions
//! - Records are rebuilt from scratch every cycle; nothing is cached
//! - Malformed attributes are skipped, malformed structure is fatal

pub mod reader;
pub mod service;

pub use reader::{read_services, RegistryError};
pub use service::Service;

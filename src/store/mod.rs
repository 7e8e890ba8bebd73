//! Key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! registry / reconcile / watch
//!     → KeyValueStore trait (get, set, delete, watch)
//!     → etcd.rs   (etcd v2 keys API over HTTP, endpoint failover)
//!     → memory.rs (in-process tree with the same semantics)
//!
//! Recursive reads:
//!     Node tree → node.rs Snapshot (flat key → value map + directory set)
//! ```
//!
//! # Design Decisions
//! - The trait is the only seam; nothing above it knows about HTTP
//! - Directories and leaves are distinguished structurally (`Node::dir`)
//! - Errors say whether they are retryable; callers decide what is fatal

pub mod etcd;
pub mod memory;
pub mod node;

use async_trait::async_trait;
use thiserror::Error;

pub use etcd::EtcdStore;
pub use memory::MemoryStore;
pub use node::{Node, Snapshot};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Network or cluster problem; the operation may succeed if retried.
    #[error("Transient store error: {0}")]
    Transient(String),

    /// The watch index fell out of the store's event history.
    #[error("Watch index cleared: {0}")]
    IndexCleared(String),

    /// The store rejected the request.
    #[error("Store error {code}: {message} ({cause})")]
    Api {
        code: u64,
        message: String,
        cause: String,
    },

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An endpoint URL cannot be used to address keys.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("Client error: {0}")]
    Client(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::IndexCleared(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A single mutation observed by a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Store action ("set", "delete", "expire", ...).
    pub action: String,
    /// Key that changed.
    pub key: String,
    /// Modification index of the change.
    pub index: u64,
}

/// Hierarchical key-value store contract.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. With `recursive`, directories come back with their whole subtree.
    async fn get(&self, path: &str, recursive: bool) -> StoreResult<Node>;

    /// Write a leaf value, creating parent directories as needed.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Directories require `recursive`.
    async fn delete(&self, key: &str, recursive: bool) -> StoreResult<()>;

    /// Subscribe to every mutation at or below `prefix`.
    fn watch(&self, prefix: &str) -> Box<dyn StoreWatch>;
}

/// A live watch subscription.
#[async_trait]
pub trait StoreWatch: Send {
    /// Wait for the next mutation.
    async fn next(&mut self) -> StoreResult<WatchEvent>;
}

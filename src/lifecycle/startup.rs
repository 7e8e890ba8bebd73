//! Startup checks.
//!
//! # Responsibilities
//! - Prove the store is reachable before anything is spawned
//!
//! # Design Decisions
//! - Fail fast: an unreachable store at startup is fatal
//! - A missing services root is fine; the first cycle treats it as empty

use thiserror::Error;

use crate::config::SyncConfig;
use crate::store::{KeyValueStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Store unreachable at startup: {0}")]
    Store(#[from] StoreError),
}

/// Probe the store with a shallow read of the services root.
pub async fn verify_store<S>(store: &S, config: &SyncConfig) -> Result<(), StartupError>
where
    S: KeyValueStore + ?Sized,
{
    match store.get(&config.services_root, false).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            tracing::warn!(root = %config.services_root, "Services root does not exist yet");
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!("Store connectivity verified");
    Ok(())
}

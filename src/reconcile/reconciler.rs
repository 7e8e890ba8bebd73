//! Applies a plan to the store.
//!
//! # Responsibilities
//! - Read the live proxy tree
//! - Run the delete, upsert and prune passes in order
//! - Count what happened for logs and metrics
//!
//! # Design Decisions
//! - Best effort: a failed key is logged, counted and skipped
//! - No rollback; the next cycle converges from whatever state is left
//! - Only a failure to read the live tree aborts the cycle

use std::collections::BTreeSet;

use thiserror::Error;

use crate::builder::DesiredState;
use crate::reconcile::encode::encode;
use crate::reconcile::layout::{KeyClass, ProxyLayout};
use crate::reconcile::plan::{plan, Plan};
use crate::store::{KeyValueStore, Snapshot, StoreError};

/// Errors that abort a reconcile cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The live tree could not be read; nothing was changed.
    #[error("Failed to read existing proxy configuration: {0}")]
    ReadExisting(#[source] StoreError),

    /// The desired state could not be serialized.
    #[error("Failed to encode desired configuration: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub writes: usize,
    pub deletes: usize,
    pub pruned: usize,
    pub failures: usize,
    pub unchanged: usize,
    pub foreign: usize,
}

impl ReconcileReport {
    /// True when the pass changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.writes == 0 && self.deletes == 0 && self.pruned == 0
    }
}

/// Keeps the managed part of the proxy tree equal to a desired state.
pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
    layout: ProxyLayout,
}

impl<'a, S> Reconciler<'a, S>
where
    S: KeyValueStore + ?Sized,
{
    pub fn new(store: &'a S, proxy_root: &str) -> Self {
        Self {
            store,
            layout: ProxyLayout::new(proxy_root),
        }
    }

    /// Read the live tree. A missing root is an empty tree.
    pub async fn read_existing(&self) -> Result<Snapshot, ReconcileError> {
        match self.store.get(self.layout.root(), true).await {
            Ok(node) => Ok(Snapshot::from_node(&node)),
            Err(e) if e.is_not_found() => Ok(Snapshot::default()),
            Err(e) => Err(ReconcileError::ReadExisting(e)),
        }
    }

    /// Compute the plan without applying it.
    pub async fn dry_run(&self, desired: &DesiredState) -> Result<Plan, ReconcileError> {
        let new_conf = encode(desired, &self.layout)?;
        let existing = self.read_existing().await?;
        Ok(plan(&self.layout, &existing, &new_conf))
    }

    /// Make the store's managed subtree match `desired`.
    pub async fn reconcile(&self, desired: &DesiredState) -> Result<ReconcileReport, ReconcileError> {
        let new_conf = encode(desired, &self.layout)?;
        let existing = self.read_existing().await?;
        let plan = plan(&self.layout, &existing, &new_conf);

        let mut report = ReconcileReport {
            unchanged: plan.unchanged,
            foreign: plan.foreign,
            ..Default::default()
        };

        let mut remaining: BTreeSet<&str> = existing
            .leaves
            .keys()
            .map(String::as_str)
            .filter(|k| self.layout.classify(k).is_managed())
            .collect();

        for key in &plan.deletes {
            match self.store.delete(key, false).await {
                Ok(()) => {
                    tracing::debug!(key = %key, "Deleted");
                    report.deletes += 1;
                    remaining.remove(key.as_str());
                }
                Err(e) if e.is_not_found() => {
                    remaining.remove(key.as_str());
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete key, continuing");
                    report.failures += 1;
                }
            }
        }

        for (key, value) in &plan.upserts {
            match self.store.set(key, value).await {
                Ok(()) => {
                    tracing::debug!(key = %key, "Written");
                    report.writes += 1;
                    remaining.insert(key.as_str());
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to write key, continuing");
                    report.failures += 1;
                }
            }
        }

        self.prune(&existing, &remaining, &mut report).await;

        Ok(report)
    }

    /// Remove managed frontend/backend directories that no longer hold any value.
    async fn prune(&self, existing: &Snapshot, remaining: &BTreeSet<&str>, report: &mut ReconcileReport) {
        let (frontends, backends): (Vec<&String>, Vec<&String>) = existing
            .dirs
            .iter()
            .filter(|dir| self.layout.is_managed_entity_dir(dir))
            .filter(|dir| {
                let prefix = format!("{}/", dir);
                !remaining.iter().any(|k| k.starts_with(&prefix))
            })
            .partition(|dir| self.layout.classify(dir) == KeyClass::Frontend);

        for dir in frontends.into_iter().chain(backends) {
            match self.store.delete(dir, true).await {
                Ok(()) => {
                    tracing::debug!(dir = %dir, "Pruned empty directory");
                    report.pruned += 1;
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(dir = %dir, error = %e, "Failed to prune directory, continuing");
                    report.failures += 1;
                }
            }
        }
    }
}

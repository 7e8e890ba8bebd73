//! The orchestrator state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::builder;
use crate::config::SyncConfig;
use crate::observability::metrics;
use crate::reconcile::Reconciler;
use crate::registry::{read_services, RegistryError};
use crate::store::KeyValueStore;
use crate::watch::ChangeSignal;

/// Errors that stop the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Service registry unusable: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reconciling,
    WaitingForChange,
    Cooldown,
}

/// Drives read → build → reconcile cycles in response to change signals.
pub struct Orchestrator<S: ?Sized> {
    store: Arc<S>,
    services_root: String,
    proxy_root: String,
    cooldown: Duration,
    signal: ChangeSignal,
    // false once the watcher has gone away
    signal_open: bool,
}

impl<S> Orchestrator<S>
where
    S: KeyValueStore + ?Sized,
{
    pub fn new(store: Arc<S>, sync: &SyncConfig, signal: ChangeSignal) -> Self {
        Self {
            store,
            services_root: sync.services_root.clone(),
            proxy_root: sync.proxy_root.clone(),
            cooldown: sync.cooldown(),
            signal,
            signal_open: true,
        }
    }

    /// Run until shutdown is requested or the registry becomes unreadable.
    ///
    /// Shutdown is only honored between cycles. A request that arrives
    /// mid-cycle stays buffered in `shutdown` until the next idle point.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), OrchestratorError> {
        tracing::info!(
            services_root = %self.services_root,
            proxy_root = %self.proxy_root,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Orchestrator started"
        );

        let mut phase = Phase::Reconciling;
        loop {
            phase = match phase {
                Phase::Reconciling => {
                    // changes seen so far are covered by this cycle
                    self.signal.drain();
                    let cycle_id = Uuid::new_v4();
                    self.run_cycle()
                        .instrument(tracing::info_span!("cycle", cycle_id = %cycle_id))
                        .await?;
                    Phase::WaitingForChange
                }
                Phase::WaitingForChange => {
                    if self.wait_for_change(&mut shutdown).await {
                        Phase::Cooldown
                    } else {
                        tracing::info!("Orchestrator stopping");
                        return Ok(());
                    }
                }
                Phase::Cooldown => {
                    tracing::debug!(cooldown_ms = self.cooldown.as_millis() as u64, "Change detected, cooling down");
                    tokio::time::sleep(self.cooldown).await;
                    Phase::Reconciling
                }
            };
        }
    }

    /// Returns `true` on a change and `false` on shutdown.
    async fn wait_for_change(&mut self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        if !self.signal_open {
            let _ = shutdown.recv().await;
            return false;
        }

        let changed = tokio::select! {
            _ = shutdown.recv() => return false,
            open = self.signal.wait() => open,
        };
        if !changed {
            tracing::error!("Change watcher is gone, no further rebuilds until restart");
            self.signal_open = false;
            let _ = shutdown.recv().await;
        }
        changed
    }

    /// One full pass: read the registry, build, reconcile.
    ///
    /// Reconcile failures are logged and end the cycle. Registry failures
    /// are returned.
    pub async fn run_cycle(&self) -> Result<(), RegistryError> {
        let started = Instant::now();

        let services = match read_services(self.store.as_ref(), &self.services_root).await {
            Ok(services) => services,
            Err(e) => {
                metrics::record_cycle("fatal", started);
                tracing::error!(error = %e, "Failed to read service registry");
                return Err(e);
            }
        };
        metrics::record_services(services.len());

        let desired = builder::build(&services);
        tracing::debug!(
            services = services.len(),
            frontends = desired.frontends.len(),
            backends = desired.backends.len(),
            "Desired configuration built"
        );

        let reconciler = Reconciler::new(self.store.as_ref(), &self.proxy_root);
        match reconciler.reconcile(&desired).await {
            Ok(report) => {
                metrics::record_report(&report);
                metrics::record_cycle("ok", started);
                if report.is_noop() {
                    tracing::debug!(unchanged = report.unchanged, "Proxy configuration already up to date");
                } else {
                    tracing::info!(
                        writes = report.writes,
                        deletes = report.deletes,
                        pruned = report.pruned,
                        failures = report.failures,
                        foreign = report.foreign,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Proxy configuration reconciled"
                    );
                }
            }
            Err(e) => {
                metrics::record_cycle("aborted", started);
                tracing::warn!(error = %e, "Reconcile cycle aborted");
            }
        }
        Ok(())
    }
}

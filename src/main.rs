//! Vulcan Config Builder
//!
//! Watches a tree of service declarations in etcd and keeps the vulcand
//! proxy configuration tree in step with it.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────────────┐
//!                  │                   VULCAN CONFIG BUILDER                    │
//!                  │                                                            │
//!   etcd           │  ┌──────────┐  signal  ┌──────────────┐                    │
//!   services  ─────┼─▶│  watch   │ ───────▶ │ orchestrator │                    │
//!   tree      ─┐   │  │ watcher  │ (1 slot) │  state loop  │                    │
//!              │   │  └──────────┘          └──────┬───────┘                    │
//!              │   │                               │ cycle                      │
//!              │   │                               ▼                            │
//!              │   │  ┌──────────┐    ┌──────────┐    ┌─────────────┐           │
//!              └───┼─▶│ registry │───▶│ builder  │───▶│  reconcile  │───────────┼──▶ etcd
//!                  │  │  reader  │    │ (pure)   │    │ diff+apply  │           │    vulcand
//!                  │  └──────────┘    └──────────┘    └─────────────┘           │    tree
//!                  │                                                            │
//!                  │  ┌──────────────────────────────────────────────────────┐  │
//!                  │  │               Cross-Cutting Concerns                  │  │
//!                  │  │  ┌────────┐ ┌─────────────┐ ┌───────────────────┐     │  │
//!                  │  │  │ config │ │observability│ │     lifecycle     │     │  │
//!                  │  │  │        │ │ logs+metrics│ │ startup/shutdown  │     │  │
//!                  │  │  └────────┘ └─────────────┘ └───────────────────┘     │  │
//!                  │  └──────────────────────────────────────────────────────┘  │
//!                  └────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use vulcan_config_builder::config::validation::validate_config;
use vulcan_config_builder::config::{load_config, Config, ConfigError};
use vulcan_config_builder::lifecycle::{verify_store, Shutdown};
use vulcan_config_builder::observability::{init_logging, metrics};
use vulcan_config_builder::orchestrator::Orchestrator;
use vulcan_config_builder::store::EtcdStore;
use vulcan_config_builder::watch::{change_channel, ChangeWatcher};

#[derive(Parser, Debug)]
#[command(name = "vulcan-config-builder")]
#[command(about = "Generates vulcand configuration from service declarations in etcd", long_about = None)]
struct Args {
    /// TOML configuration file. Flags below override its values.
    #[arg(short, long, env = "VCB_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated etcd client URLs.
    #[arg(long, env = "ETCD_PEERS", value_delimiter = ',')]
    etcd_peers: Option<Vec<String>>,

    /// SOCKS5 proxy for etcd traffic (host:port).
    #[arg(long, env = "SOCKS_PROXY")]
    socks_proxy: Option<String>,

    /// Delay after a change before rebuilding, in milliseconds.
    #[arg(long, env = "COOLDOWN_MS")]
    cooldown_ms: Option<u64>,

    /// Root of the service declarations.
    #[arg(long, env = "SERVICES_ROOT")]
    services_root: Option<String>,

    /// Root of the vulcand configuration tree.
    #[arg(long, env = "PROXY_ROOT")]
    proxy_root: Option<String>,

    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn resolve(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        if let Some(peers) = self.etcd_peers {
            config.store.endpoints = peers.into_iter().map(|p| p.trim().to_string()).collect();
        }
        if self.socks_proxy.is_some() {
            config.store.socks_proxy = self.socks_proxy;
        }
        if let Some(cooldown) = self.cooldown_ms {
            config.sync.cooldown_ms = cooldown;
        }
        if let Some(root) = self.services_root {
            config.sync.services_root = root;
        }
        if let Some(root) = self.proxy_root {
            config.sync.proxy_root = root;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        config.observability.json_logs |= self.json_logs;

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Args::parse().resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoints = ?config.store.endpoints,
        socks_proxy = config.store.socks_proxy.as_deref().unwrap_or("none"),
        services_root = %config.sync.services_root,
        proxy_root = %config.sync.proxy_root,
        "vulcan-config-builder starting"
    );

    let store = Arc::new(EtcdStore::new(&config.store)?);
    verify_store(store.as_ref(), &config.sync).await?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (notifier, signal) = change_channel();
    let watcher = ChangeWatcher::new(
        store.clone(),
        &config.sync.services_root,
        config.sync.watch_retry(),
        notifier,
    )
    .spawn();

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let _signals = shutdown.trigger_on_signal();

    let orchestrator = Orchestrator::new(store, &config.sync, signal);
    let result = orchestrator.run(shutdown_rx).await;

    watcher.abort();
    result.map_err(Into::into)
}

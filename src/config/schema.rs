//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the builder.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the config builder.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Key-value store connection settings.
    pub store: StoreConfig,

    /// Source and target trees, debounce timings.
    pub sync: SyncConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Key-value store (etcd) connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// etcd client URLs (e.g., "http://localhost:2379").
    pub endpoints: Vec<String>,

    /// Optional SOCKS5 proxy every store request goes through ("host:port").
    pub socks_proxy: Option<String>,

    /// Per-request timeout in milliseconds. Watches are exempt.
    pub request_timeout_ms: u64,
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:2379".to_string()],
            socks_proxy: None,
            request_timeout_ms: 1000,
        }
    }
}

/// Where services are read from, where proxy config is written to, and
/// how change bursts are debounced.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the declarative service tree (one directory per service).
    pub services_root: String,

    /// Root of the proxy control plane's tree (holds `frontends/` and `backends/`).
    pub proxy_root: String,

    /// Delay after a change before rebuilding, in milliseconds.
    pub cooldown_ms: u64,

    /// Fixed delay before retrying a failed watch, in milliseconds.
    pub watch_retry_ms: u64,
}

impl SyncConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn watch_retry(&self) -> Duration {
        Duration::from_millis(self.watch_retry_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            services_root: "/ft/services".to_string(),
            proxy_root: "/vulcand".to_string(),
            cooldown_ms: 5000,
            watch_retry_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

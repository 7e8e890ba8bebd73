//! Desired proxy configuration.

use std::collections::BTreeMap;

/// Name tag carried by every backend this system owns.
pub const BACKEND_TAG: &str = "b:";

/// Name tag carried by every frontend this system owns.
pub const FRONTEND_TAG: &str = "fe:";

/// Proxy protocol for every generated frontend and backend.
pub const HTTP: &str = "http";

/// Complete target configuration for one cycle.
///
/// Ordered maps keep iteration, and therefore encoding, deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub frontends: BTreeMap<String, Frontend>,
    pub backends: BTreeMap<String, Backend>,
}

impl DesiredState {
    pub fn is_empty(&self) -> bool {
        self.frontends.is_empty() && self.backends.is_empty()
    }
}

/// A request matcher bound to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontend {
    pub kind: &'static str,
    pub backend_id: String,
    /// Route predicate in the proxy's routing language.
    pub route: String,
    pub rewrite: Option<RewriteRule>,
    pub failover_predicate: String,
}

impl Frontend {
    pub fn http(backend_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            kind: HTTP,
            backend_id: backend_id.into(),
            route: route.into(),
            rewrite: None,
            failover_predicate: String::new(),
        }
    }

    pub fn with_rewrite(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.rewrite = Some(RewriteRule {
            pattern: pattern.into(),
            replacement: replacement.into(),
        });
        self
    }

    pub fn with_failover_predicate(mut self, predicate: Option<&str>) -> Self {
        self.failover_predicate = predicate.unwrap_or_default().to_string();
        self
    }
}

/// Path rewrite applied before forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

/// A pool of upstream servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backend {
    /// server id → validated `host:port`.
    pub servers: BTreeMap<String, String>,
}

//! Declarative service record.

use std::collections::BTreeMap;

use serde::Serialize;

/// One service as described under the services root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Directory name of the service; unique within the tree.
    pub name: String,

    /// `healthcheck = "true"`.
    pub has_health_check: bool,

    /// server id → "host:port" (unvalidated).
    pub addresses: BTreeMap<String, String>,

    /// path name → route pattern.
    pub path_prefixes: BTreeMap<String, String>,

    /// path name → Host header override for that path.
    pub path_hosts: BTreeMap<String, String>,

    pub failover_predicate: Option<String>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_health_check(mut self) -> Self {
        self.has_health_check = true;
        self
    }

    pub fn with_address(mut self, id: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(id.into(), address.into());
        self
    }

    pub fn with_path(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.path_prefixes.insert(name.into(), pattern.into());
        self
    }

    pub fn with_path_host(mut self, name: impl Into<String>, host: impl Into<String>) -> Self {
        self.path_hosts.insert(name.into(), host.into());
        self
    }

    pub fn with_failover_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.failover_predicate = Some(predicate.into());
        self
    }
}

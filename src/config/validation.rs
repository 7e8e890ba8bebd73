//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint URLs and the SOCKS proxy address
//! - Check that the service tree and the proxy tree are disjoint
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::Config;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "store.endpoints").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.endpoints.is_empty() {
        errors.push(ValidationError::new("store.endpoints", "at least one endpoint is required"));
    }
    for endpoint in &config.store.endpoints {
        match Url::parse(endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                "store.endpoints",
                format!("unsupported scheme '{}' in '{}'", url.scheme(), endpoint),
            )),
            Err(e) => errors.push(ValidationError::new(
                "store.endpoints",
                format!("invalid URL '{}': {}", endpoint, e),
            )),
        }
    }

    if let Some(proxy) = &config.store.socks_proxy {
        let valid = proxy
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::new(
                "store.socks_proxy",
                format!("expected host:port, got '{}'", proxy),
            ));
        }
    }

    if config.store.request_timeout_ms == 0 {
        errors.push(ValidationError::new("store.request_timeout_ms", "must be greater than zero"));
    }

    let services = normalize(&config.sync.services_root);
    let proxy = normalize(&config.sync.proxy_root);
    if !services.starts_with('/') {
        errors.push(ValidationError::new("sync.services_root", "must be an absolute key path"));
    }
    if !proxy.starts_with('/') || proxy == "/" {
        errors.push(ValidationError::new(
            "sync.proxy_root",
            "must be an absolute key path below the store root",
        ));
    }
    if contains(&services, &proxy) || contains(&proxy, &services) {
        errors.push(ValidationError::new(
            "sync.proxy_root",
            format!("'{}' overlaps the watched service tree '{}'", proxy, services),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// True when `inner` equals `outer` or lives below it.
fn contains(outer: &str, inner: &str) -> bool {
    outer == "/" || inner == outer || inner.starts_with(&format!("{}/", outer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.store.endpoints = vec!["ftp://etcd:2379".into(), "not a url".into()];
        config.store.request_timeout_ms = 0;
        config.store.socks_proxy = Some("localhost".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.field == "store.socks_proxy"));
        assert!(errors.iter().any(|e| e.field == "store.request_timeout_ms"));
    }

    #[test]
    fn test_overlapping_roots_rejected() {
        let mut config = Config::default();
        config.sync.services_root = "/ft".into();
        config.sync.proxy_root = "/ft/vulcand/".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "sync.proxy_root");
        assert!(errors[0].to_string().contains("overlaps"));
    }

    #[test]
    fn test_sibling_roots_with_shared_prefix_allowed() {
        let mut config = Config::default();
        config.sync.services_root = "/ft/services".into();
        config.sync.proxy_root = "/ft/services-proxy".into();
        assert!(validate_config(&config).is_ok());
    }
}

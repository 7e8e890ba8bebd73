//! Service tree reader.
//!
//! # Responsibilities
//! - Read the whole services root in one recursive get
//! - Turn each service directory into a `Service`
//! - Skip unknown attributes, reject structural violations
//!
//! # Design Decisions
//! - A missing root is an empty registry, not an error
//! - Any other failure aborts the read: a partial view of the registry would
//!   make the reconciler delete the services it failed to see

use std::collections::BTreeMap;

use thiserror::Error;

use crate::registry::service::Service;
use crate::store::{KeyValueStore, Node, StoreError};

const HEALTHCHECK: &str = "healthcheck";
const SERVERS: &str = "servers";
const PATH_REGEX: &str = "path-regex";
const PATH_HOST: &str = "path-host";
const FAILOVER_PREDICATE: &str = "failover-predicate";

/// Errors that can occur while reading the service registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The store could not be read.
    #[error("Failed to read service tree: {0}")]
    Store(#[from] StoreError),

    /// A leaf sits where a directory belongs, or the reverse.
    #[error("Unexpected tree structure at {key}: expected a {expected}")]
    Structure { key: String, expected: &'static str },
}

/// Read every service defined below `root`.
pub async fn read_services<S>(store: &S, root: &str) -> Result<Vec<Service>, RegistryError>
where
    S: KeyValueStore + ?Sized,
{
    let tree = match store.get(root, true).await {
        Ok(tree) => tree,
        Err(e) if e.is_not_found() => {
            tracing::info!(root = %root, "Service root does not exist, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    expect_dir(&tree)?;

    let services = tree
        .nodes
        .iter()
        .map(parse_service)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(root = %root, count = services.len(), "Service registry read");
    Ok(services)
}

fn parse_service(dir: &Node) -> Result<Service, RegistryError> {
    expect_dir(dir)?;
    let mut service = Service::new(dir.name());

    for child in &dir.nodes {
        match child.name() {
            HEALTHCHECK => {
                expect_leaf(child)?;
                service.has_health_check = child.value_str() == "true";
            }
            SERVERS => service.addresses = leaf_map(child)?,
            PATH_REGEX => service.path_prefixes = leaf_map(child)?,
            PATH_HOST => service.path_hosts = leaf_map(child)?,
            FAILOVER_PREDICATE => {
                expect_leaf(child)?;
                let value = child.value_str();
                if !value.is_empty() {
                    service.failover_predicate = Some(value.to_string());
                }
            }
            other => {
                tracing::warn!(service = %service.name, key = %other, "Ignoring unrecognised service attribute");
            }
        }
    }

    let orphans: Vec<String> = service
        .path_hosts
        .keys()
        .filter(|name| !service.path_prefixes.contains_key(*name))
        .cloned()
        .collect();
    for name in orphans {
        tracing::warn!(service = %service.name, path = %name, "Ignoring path-host without a matching path-regex");
        service.path_hosts.remove(&name);
    }

    Ok(service)
}

/// Collect the leaves of a directory as name → value.
fn leaf_map(dir: &Node) -> Result<BTreeMap<String, String>, RegistryError> {
    expect_dir(dir)?;
    dir.nodes
        .iter()
        .map(|leaf| {
            expect_leaf(leaf)?;
            Ok((leaf.name().to_string(), leaf.value_str().to_string()))
        })
        .collect()
}

fn expect_dir(node: &Node) -> Result<(), RegistryError> {
    if node.dir {
        Ok(())
    } else {
        Err(RegistryError::Structure {
            key: node.key.clone(),
            expected: "directory",
        })
    }
}

fn expect_leaf(node: &Node) -> Result<(), RegistryError> {
    if node.dir {
        Err(RegistryError::Structure {
            key: node.key.clone(),
            expected: "value",
        })
    } else {
        Ok(())
    }
}

//! Store tree nodes and their flattened form.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A node in the store's key tree, as returned by a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Node {
    /// Absolute key ("/ft/services/svc-a").
    #[serde(default)]
    pub key: String,

    /// True for directories.
    #[serde(default)]
    pub dir: bool,

    /// Leaf value; always `None` for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Children of a directory (only populated by recursive reads).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,

    #[serde(rename = "modifiedIndex", default)]
    pub modified_index: u64,
}

impl Node {
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn directory(key: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            dir: true,
            nodes,
            ..Default::default()
        }
    }

    /// Last path segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or("")
    }

    /// Leaf value, or the empty string for directories.
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Flat view of a subtree: every leaf keyed by absolute path, plus the set of
/// directories that existed (including empty ones).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub leaves: BTreeMap<String, String>,
    pub dirs: BTreeSet<String>,
}

impl Snapshot {
    /// Walk a node tree into its flat form.
    pub fn from_node(root: &Node) -> Self {
        let mut snapshot = Self::default();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.dir {
                if !node.key.is_empty() {
                    snapshot.dirs.insert(node.key.clone());
                }
                stack.extend(node.nodes.iter());
            } else {
                snapshot
                    .leaves
                    .insert(node.key.clone(), node.value_str().to_string());
            }
        }
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty() && self.dirs.is_empty()
    }
}

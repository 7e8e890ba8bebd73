//! In-process store with etcd v2 tree semantics.
//!
//! Stands in for a cluster in the test suites. Every mutation is appended to
//! a journal so callers can assert on write ordering, and individual keys can
//! be made to fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::store::node::Node;
use crate::store::{KeyValueStore, StoreError, StoreResult, StoreWatch, WatchEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Dir,
    Leaf(String),
}

/// A mutation recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Set(String),
    Delete(String),
}

impl Operation {
    pub fn key(&self) -> &str {
        match self {
            Operation::Set(k) | Operation::Delete(k) => k,
        }
    }
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    journal: Vec<Operation>,
    failing_keys: HashSet<String>,
    failing_reads: HashSet<String>,
    reads: HashMap<String, usize>,
}

/// Thread-safe in-memory store.
pub struct MemoryStore {
    state: Mutex<State>,
    index: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(State::default()),
            index: AtomicU64::new(1),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a leaf without journaling or notifying watchers.
    pub fn seed(&self, key: &str, value: &str) {
        let key = normalize(key);
        let mut state = self.lock();
        for parent in parents(&key) {
            state.entries.insert(parent, Entry::Dir);
        }
        state.entries.insert(key, Entry::Leaf(value.to_string()));
    }

    /// Create an empty directory without journaling or notifying watchers.
    pub fn seed_dir(&self, key: &str) {
        let key = normalize(key);
        let mut state = self.lock();
        for parent in parents(&key) {
            state.entries.insert(parent, Entry::Dir);
        }
        state.entries.insert(key, Entry::Dir);
    }

    /// All leaves at or below `prefix`.
    pub fn leaves(&self, prefix: &str) -> BTreeMap<String, String> {
        let prefix = normalize(prefix);
        self.lock()
            .entries
            .iter()
            .filter(|(k, _)| is_under(k, &prefix))
            .filter_map(|(k, e)| match e {
                Entry::Leaf(v) => Some((k.clone(), v.clone())),
                Entry::Dir => None,
            })
            .collect()
    }

    /// True if `key` exists as a leaf or directory.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(&normalize(key))
    }

    /// Mutations performed through the trait, in order.
    pub fn journal(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Make every set/delete of `key` fail with a transient error.
    pub fn fail_writes_to(&self, key: &str) {
        self.lock().failing_keys.insert(normalize(key));
    }

    /// Make every get of `path` fail with a transient error.
    pub fn fail_reads_of(&self, path: &str) {
        self.lock().failing_reads.insert(normalize(path));
    }

    /// Number of `get` calls made for exactly `path`.
    pub fn read_count(&self, path: &str) -> usize {
        self.lock().reads.get(&normalize(path)).copied().unwrap_or(0)
    }

    /// Set a leaf and notify watchers, as an external writer would.
    pub async fn publish(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set(key, value).await
    }

    fn notify(&self, action: &str, key: &str) {
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        // no receivers is fine
        let _ = self.events.send(WatchEvent {
            action: action.to_string(),
            key: key.to_string(),
            index,
        });
    }
}

fn normalize(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn is_under(key: &str, prefix: &str) -> bool {
    prefix == "/" || key == prefix || key.starts_with(&format!("{}/", prefix))
}

/// Proper ancestors of a key, outermost first ("/" excluded).
fn parents(key: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        current.push('/');
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

fn build_node(entries: &BTreeMap<String, Entry>, key: &str, recursive: bool, depth: usize) -> Node {
    match entries.get(key) {
        Some(Entry::Leaf(value)) => Node::leaf(key, value.clone()),
        _ => {
            let mut children = Vec::new();
            if depth == 0 || recursive {
                let prefix = if key == "/" { "/".to_string() } else { format!("{}/", key) };
                for child in entries
                    .range(prefix.clone()..)
                    .map(|(k, _)| k)
                    .take_while(|k| k.starts_with(&prefix))
                    .filter(|k| !k[prefix.len()..].contains('/'))
                {
                    children.push(build_node(entries, child, recursive, depth + 1));
                }
            }
            Node::directory(if key == "/" { "" } else { key }, children)
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, path: &str, recursive: bool) -> StoreResult<Node> {
        let path = normalize(path);
        let mut state = self.lock();
        *state.reads.entry(path.clone()).or_insert(0) += 1;
        if state.failing_reads.contains(&path) {
            return Err(StoreError::Transient(format!("injected read failure for {}", path)));
        }
        if path != "/" && !state.entries.contains_key(&path) {
            return Err(StoreError::NotFound(path));
        }
        Ok(build_node(&state.entries, &path, recursive, 0))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = normalize(key);
        {
            let mut state = self.lock();
            state.journal.push(Operation::Set(key.clone()));
            if state.failing_keys.contains(&key) {
                return Err(StoreError::Transient(format!("injected write failure for {}", key)));
            }
            if state.entries.get(&key) == Some(&Entry::Dir) {
                return Err(StoreError::Api {
                    code: 102,
                    message: "Not a file".to_string(),
                    cause: key,
                });
            }
            let ancestors = parents(&key);
            if let Some(leaf) = ancestors
                .iter()
                .find(|p| matches!(state.entries.get(p.as_str()), Some(Entry::Leaf(_))))
            {
                return Err(StoreError::Api {
                    code: 104,
                    message: "Not a directory".to_string(),
                    cause: leaf.clone(),
                });
            }
            for parent in ancestors {
                state.entries.insert(parent, Entry::Dir);
            }
            state.entries.insert(key.clone(), Entry::Leaf(value.to_string()));
        }
        self.notify("set", &key);
        Ok(())
    }

    async fn delete(&self, key: &str, recursive: bool) -> StoreResult<()> {
        let key = normalize(key);
        {
            let mut state = self.lock();
            state.journal.push(Operation::Delete(key.clone()));
            if state.failing_keys.contains(&key) {
                return Err(StoreError::Transient(format!("injected delete failure for {}", key)));
            }
            match state.entries.get(&key) {
                None => return Err(StoreError::NotFound(key)),
                Some(Entry::Dir) if !recursive => {
                    return Err(StoreError::Api {
                        code: 102,
                        message: "Not a file".to_string(),
                        cause: key,
                    })
                }
                _ => {}
            }
            state.entries.retain(|k, _| !is_under(k, &key));
        }
        self.notify("delete", &key);
        Ok(())
    }

    fn watch(&self, prefix: &str) -> Box<dyn StoreWatch> {
        Box::new(MemoryWatch {
            prefix: normalize(prefix),
            events: self.events.subscribe(),
        })
    }
}

struct MemoryWatch {
    prefix: String,
    events: broadcast::Receiver<WatchEvent>,
}

#[async_trait]
impl StoreWatch for MemoryWatch {
    async fn next(&mut self) -> StoreResult<WatchEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if is_under(&event.key, &self.prefix) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(StoreError::IndexCleared(format!("{} events skipped", skipped)))
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::Transient("store closed".to_string()))
                }
            }
        }
    }
}

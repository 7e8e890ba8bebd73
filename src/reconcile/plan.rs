//! Diff between the live proxy tree and the desired key map.

use std::collections::BTreeMap;

use crate::reconcile::layout::{KeyClass, ProxyLayout};
use crate::store::Snapshot;

/// Ordered changes that turn the live tree into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Keys to delete: every frontend key, then every backend key.
    pub deletes: Vec<String>,
    /// Keys to write: backends, then frontend records, then the rest.
    pub upserts: Vec<(String, String)>,
    /// Managed keys already holding the desired value.
    pub unchanged: usize,
    /// Keys outside the managed namespace, left alone.
    pub foreign: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.upserts.is_empty()
    }
}

/// Compute the ordered delete and upsert lists.
///
/// Within one entity deletes run children-first (servers before the backend
/// record, middlewares before the frontend record) and upserts run
/// record-first, so the proxy never sees a dangling reference.
pub fn plan(layout: &ProxyLayout, existing: &Snapshot, desired: &BTreeMap<String, String>) -> Plan {
    let mut result = Plan::default();

    let mut frontend_deletes = Vec::new();
    let mut backend_deletes = Vec::new();
    for key in existing.leaves.keys() {
        match layout.classify(key) {
            KeyClass::Foreign => result.foreign += 1,
            KeyClass::Frontend if !desired.contains_key(key) => frontend_deletes.push(key.clone()),
            KeyClass::Backend if !desired.contains_key(key) => backend_deletes.push(key.clone()),
            _ => {}
        }
    }
    result.deletes = frontend_deletes
        .into_iter()
        .rev()
        .chain(backend_deletes.into_iter().rev())
        .collect();

    let mut backends = Vec::new();
    let mut frontends = Vec::new();
    let mut remainder = Vec::new();
    for (key, value) in desired {
        if existing.leaves.get(key) == Some(value) {
            result.unchanged += 1;
            continue;
        }
        let entry = (key.clone(), value.clone());
        match layout.classify(key) {
            KeyClass::Backend => backends.push(entry),
            KeyClass::Frontend if !layout.is_middleware(key) => frontends.push(entry),
            _ => remainder.push(entry),
        }
    }
    result.upserts = backends.into_iter().chain(frontends).chain(remainder).collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            leaves: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }

    fn desired(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_deletes_frontends_before_backends() {
        let layout = ProxyLayout::new("/vulcand");
        let existing = snapshot(&[
            ("/vulcand/backends/b:old/backend", "{}"),
            ("/vulcand/backends/b:old/servers/1", "{}"),
            ("/vulcand/frontends/fe:byhost:old/frontend", "{}"),
            ("/vulcand/frontends/fe:internal:old/frontend", "{}"),
            ("/vulcand/frontends/fe:internal:old/middlewares/rewrite", "{}"),
        ]);

        let plan = plan(&layout, &existing, &BTreeMap::new());
        assert_eq!(
            plan.deletes,
            vec![
                "/vulcand/frontends/fe:internal:old/middlewares/rewrite",
                "/vulcand/frontends/fe:internal:old/frontend",
                "/vulcand/frontends/fe:byhost:old/frontend",
                "/vulcand/backends/b:old/servers/1",
                "/vulcand/backends/b:old/backend",
            ]
        );
        assert!(plan.upserts.is_empty());
    }

    #[test]
    fn test_upsert_order_and_skips_equal_values() {
        let layout = ProxyLayout::new("/vulcand");
        let existing = snapshot(&[("/vulcand/backends/b:a/backend", "same")]);
        let target = desired(&[
            ("/vulcand/frontends/fe:internal:a/middlewares/rewrite", "m"),
            ("/vulcand/frontends/fe:internal:a/frontend", "f"),
            ("/vulcand/backends/b:a/servers/1", "s"),
            ("/vulcand/backends/b:a/backend", "same"),
        ]);

        let plan = plan(&layout, &existing, &target);
        let keys: Vec<&str> = plan.upserts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "/vulcand/backends/b:a/servers/1",
                "/vulcand/frontends/fe:internal:a/frontend",
                "/vulcand/frontends/fe:internal:a/middlewares/rewrite",
            ]
        );
        assert_eq!(plan.unchanged, 1);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_foreign_keys_never_planned() {
        let layout = ProxyLayout::new("/vulcand");
        let existing = snapshot(&[
            ("/vulcand/frontends/manual/frontend", "{}"),
            ("/vulcand/backends/legacy/backend", "{}"),
            ("/vulcand/hosts/example.com/host", "{}"),
        ]);

        let plan = plan(&layout, &existing, &BTreeMap::new());
        assert!(plan.is_empty());
        assert_eq!(plan.foreign, 3);
    }

    #[test]
    fn test_changed_value_is_rewritten() {
        let layout = ProxyLayout::new("/vulcand");
        let existing = snapshot(&[("/vulcand/backends/b:a/servers/1", "old")]);
        let target = desired(&[("/vulcand/backends/b:a/servers/1", "new")]);

        let plan = plan(&layout, &existing, &target);
        assert_eq!(plan.upserts, vec![("/vulcand/backends/b:a/servers/1".to_string(), "new".to_string())]);
        assert!(plan.deletes.is_empty());
    }
}

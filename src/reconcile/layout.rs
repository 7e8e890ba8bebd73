//! Key layout of the proxy tree and namespace ownership.

use crate::builder::model::{BACKEND_TAG, FRONTEND_TAG};

const FRONTENDS: &str = "frontends";
const BACKENDS: &str = "backends";
const MIDDLEWARES: &str = "middlewares";

/// Who owns a key below the proxy root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Written by someone else; never touched.
    Foreign,
    /// Part of a `fe:` frontend.
    Frontend,
    /// Part of a `b:` backend.
    Backend,
}

impl KeyClass {
    pub fn is_managed(self) -> bool {
        self != KeyClass::Foreign
    }
}

/// Paths of the proxy tree rooted at a configurable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLayout {
    root: String,
}

impl ProxyLayout {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        if self.root.is_empty() {
            "/"
        } else {
            &self.root
        }
    }

    pub fn backend_key(&self, backend: &str) -> String {
        format!("{}/{}/{}/backend", self.root, BACKENDS, backend)
    }

    pub fn server_key(&self, backend: &str, server: &str) -> String {
        format!("{}/{}/{}/servers/{}", self.root, BACKENDS, backend, server)
    }

    pub fn frontend_key(&self, frontend: &str) -> String {
        format!("{}/{}/{}/frontend", self.root, FRONTENDS, frontend)
    }

    pub fn middleware_key(&self, frontend: &str, middleware: &str) -> String {
        format!("{}/{}/{}/{}/{}", self.root, FRONTENDS, frontend, MIDDLEWARES, middleware)
    }

    /// Path of `key` relative to the root, if it lies below it.
    fn relative<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.root.as_str())?.strip_prefix('/')
    }

    pub fn classify(&self, key: &str) -> KeyClass {
        match self.relative(key) {
            Some(rel) if owned(rel, FRONTENDS, FRONTEND_TAG) => KeyClass::Frontend,
            Some(rel) if owned(rel, BACKENDS, BACKEND_TAG) => KeyClass::Backend,
            _ => KeyClass::Foreign,
        }
    }

    /// True for keys inside a frontend's `middlewares/` directory.
    pub fn is_middleware(&self, key: &str) -> bool {
        self.relative(key)
            .map(|rel| rel.split('/').nth(2) == Some(MIDDLEWARES))
            .unwrap_or(false)
    }

    /// True if `dir` is the directory of a managed frontend or backend
    /// (`{root}/frontends/fe:...` or `{root}/backends/b:...`).
    pub fn is_managed_entity_dir(&self, dir: &str) -> bool {
        self.classify(dir).is_managed()
            && self
                .relative(dir)
                .map(|rel| rel.split('/').count() == 2)
                .unwrap_or(false)
    }
}

fn owned(rel: &str, collection: &str, tag: &str) -> bool {
    let mut parts = rel.splitn(3, '/');
    parts.next() == Some(collection) && parts.next().is_some_and(|name| name.starts_with(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let layout = ProxyLayout::new("/vulcand/");

        assert_eq!(layout.classify("/vulcand/frontends/fe:a/frontend"), KeyClass::Frontend);
        assert_eq!(layout.classify("/vulcand/backends/b:a/servers/1"), KeyClass::Backend);
        assert_eq!(layout.classify("/vulcand/backends/b:a"), KeyClass::Backend);

        assert_eq!(layout.classify("/vulcand/frontends/manual/frontend"), KeyClass::Foreign);
        assert_eq!(layout.classify("/vulcand/backends/fe:wrong-tag/backend"), KeyClass::Foreign);
        assert_eq!(layout.classify("/vulcand/listeners/l1"), KeyClass::Foreign);
        assert_eq!(layout.classify("/vulcand-other/backends/b:a/backend"), KeyClass::Foreign);
        assert_eq!(layout.classify("/vulcand/frontends"), KeyClass::Foreign);
    }

    #[test]
    fn test_keys() {
        let layout = ProxyLayout::new("/vulcand");
        assert_eq!(layout.server_key("b:a", "1"), "/vulcand/backends/b:a/servers/1");
        assert_eq!(
            layout.middleware_key("fe:a", "rewrite"),
            "/vulcand/frontends/fe:a/middlewares/rewrite"
        );
        assert!(layout.is_middleware(&layout.middleware_key("fe:a", "rewrite")));
        assert!(!layout.is_middleware(&layout.frontend_key("fe:a")));
    }

    #[test]
    fn test_entity_dirs() {
        let layout = ProxyLayout::new("/vulcand");
        assert!(layout.is_managed_entity_dir("/vulcand/frontends/fe:a"));
        assert!(layout.is_managed_entity_dir("/vulcand/backends/b:a"));
        assert!(!layout.is_managed_entity_dir("/vulcand/backends/b:a/servers"));
        assert!(!layout.is_managed_entity_dir("/vulcand/backends/manual"));
        assert!(!layout.is_managed_entity_dir("/vulcand/backends"));
    }
}

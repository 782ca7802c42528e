//! Registry of persistable structural paths.
//!
//! Populated by declarations, consulted by the persistence filter. Entries
//! accumulate across declarations: re-declaring a path overwrites its
//! default (last declaration wins) and nothing is removed except by an
//! explicit [`Registry::clear`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::tree::Tree;

/// Shared handle to the path → default mapping.
///
/// Cloning is cheap; every clone sees the same entries, so one registry can
/// be handed to the stencil engine and to any number of persistors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<BTreeMap<String, Tree>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the default at `path`.
    pub fn register(&self, path: impl Into<String>, default: Tree) {
        let path = path.into();
        let mut entries = self.entries.write();
        if let Some(previous) = entries.get(&path) {
            if *previous != default {
                log::debug!("Re-declared '{}' with a new default", path);
            }
        }
        entries.insert(path, default);
    }

    /// Whether `path` is persistable.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.read().contains_key(path)
    }

    /// Declared default at `path`.
    pub fn default_of(&self, path: &str) -> Option<Tree> {
        self.entries.read().get(path).cloned()
    }

    /// All registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. Meant for test isolation and full resets.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_contains() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.register("app.token", Tree::Null);
        assert!(registry.contains("app.token"));
        assert!(!registry.contains("app"));
        assert!(!registry.contains("token"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_membership_ignores_default_value() {
        let registry = Registry::new();
        registry.register("flag", Tree::Absent);
        assert!(registry.contains("flag"));
    }

    #[test]
    fn test_redeclare_overwrites_default() {
        let registry = Registry::new();
        registry.register("app.username", Tree::from("unknown"));
        registry.register("app.username", Tree::from("guest"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.default_of("app.username"), Some(Tree::from("guest")));
    }

    #[test]
    fn test_entries_accumulate_across_declarations() {
        let registry = Registry::new();
        registry.register("a.x", Tree::Null);
        registry.register("b.y", Tree::Null);
        assert_eq!(registry.paths(), vec!["a.x".to_string(), "b.y".to_string()]);
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = Registry::new();
        let handle = registry.clone();
        handle.register("shared", Tree::Null);
        assert!(registry.contains("shared"));

        registry.clear();
        assert!(handle.is_empty());
    }
}

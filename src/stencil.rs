//! Stencil declaration and hydration.
//!
//! A [`Stencil`] is a specification tree: field names mapped to markers
//! (persistable leaves with a default), nested stencils, or pass-through
//! values. Declaring a stencil under a namespace registers every marker's
//! structural path and returns the hydrated tree, where each marker is
//! replaced by its persisted value or its default.
//!
//! Markers never learn their path. The engine reports the path each marker
//! was bound to as a [`Binding`] instead.

use indexmap::IndexMap;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::path::compose;
use crate::persistence::codec::{FlatState, read_persisted};
use crate::platform::Storage;
use crate::registry::Registry;
use crate::settings::PersistSettings;
use crate::tree::Tree;

/// A persistable leaf: only its default is known before declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    default: Tree,
}

impl Marker {
    pub fn new(default: impl Into<Tree>) -> Self {
        Self {
            default: default.into(),
        }
    }

    /// Value used when nothing is persisted. Composite defaults are opaque:
    /// the engine never descends into them.
    pub fn default_value(&self) -> &Tree {
        &self.default
    }
}

/// One node of a specification tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Marker(Marker),
    Nested(Stencil),
    PassThrough(Tree),
}

impl Spec {
    /// Persistable leaf with a default.
    pub fn marker(default: impl Into<Tree>) -> Self {
        Spec::Marker(Marker::new(default))
    }

    /// Nested specification.
    pub fn nested<K: Into<String>>(fields: impl IntoIterator<Item = (K, Spec)>) -> Self {
        Spec::Nested(Stencil::from_fields(fields))
    }

    /// Value copied unchanged into the hydrated tree.
    pub fn value(value: impl Into<Tree>) -> Self {
        Spec::PassThrough(value.into())
    }
}

impl From<Marker> for Spec {
    fn from(marker: Marker) -> Self {
        Spec::Marker(marker)
    }
}

impl From<Stencil> for Spec {
    fn from(stencil: Stencil) -> Self {
        Spec::Nested(stencil)
    }
}

impl From<Tree> for Spec {
    fn from(tree: Tree) -> Self {
        Spec::PassThrough(tree)
    }
}

/// Where a marker's hydrated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Persisted,
    Default,
}

/// The path a marker was bound to during declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Position in the hydrated tree (no namespace).
    pub field: String,
    /// Registered structural path (namespace applied).
    pub path: String,
    pub source: Source,
}

/// Result of declaring a stencil.
#[derive(Debug, Clone, PartialEq)]
pub struct Hydration {
    tree: Tree,
    bindings: Vec<Binding>,
}

impl Hydration {
    /// Hydrated tree to seed the state container with.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Markers in declaration order (pre-order, fields in declaration order).
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Registered path of the marker at `field` in the hydrated tree.
    pub fn key_of(&self, field: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.field == field)
            .map(|b| b.path.as_str())
    }

    /// Deserialize the hydrated tree into a typed state.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        self.tree.deserialize()
    }
}

/// A specification tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stencil {
    fields: IndexMap<String, Spec>,
}

impl Stencil {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<K: Into<String>>(fields: impl IntoIterator<Item = (K, Spec)>) -> Self {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Builder: add or replace a field.
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<Spec>) -> Self {
        self.fields.insert(name.into(), spec.into());
        self
    }

    pub fn fields(&self) -> &IndexMap<String, Spec> {
        &self.fields
    }

    /// Declare against the persisted store in `storage`.
    ///
    /// Reading storage never fails the declaration: unreadable state is
    /// logged and every marker takes its default.
    pub fn declare(
        &self,
        namespace: Option<&str>,
        registry: &Registry,
        storage: &dyn Storage,
        settings: &PersistSettings,
    ) -> Hydration {
        let persisted = read_persisted(storage, &settings.storage_key);
        self.hydrate(namespace, registry, &persisted)
    }

    /// Declare against an already-decoded persisted store.
    pub fn hydrate(
        &self,
        namespace: Option<&str>,
        registry: &Registry,
        persisted: &FlatState,
    ) -> Hydration {
        let mut declaration = Declaration {
            registry,
            persisted,
            bindings: Vec::new(),
        };
        let root = namespace.unwrap_or_default();
        let tree = declaration.walk_fields(&self.fields, "", root);

        log::debug!(
            "Declared {} markers under namespace '{}'",
            declaration.bindings.len(),
            root
        );
        Hydration {
            tree,
            bindings: declaration.bindings,
        }
    }
}

/// Convenience form of [`Stencil::declare`].
pub fn declare(
    stencil: &Stencil,
    namespace: Option<&str>,
    registry: &Registry,
    storage: &dyn Storage,
    settings: &PersistSettings,
) -> Hydration {
    stencil.declare(namespace, registry, storage, settings)
}

struct Declaration<'a> {
    registry: &'a Registry,
    persisted: &'a FlatState,
    bindings: Vec<Binding>,
}

impl Declaration<'_> {
    fn walk_fields(&mut self, fields: &IndexMap<String, Spec>, field: &str, path: &str) -> Tree {
        Tree::Object(
            fields
                .iter()
                .map(|(name, spec)| {
                    let child_field = compose([field, name.as_str()]);
                    let child_path = compose([path, name.as_str()]);
                    (name.clone(), self.walk(spec, child_field, child_path))
                })
                .collect(),
        )
    }

    fn walk(&mut self, spec: &Spec, field: String, path: String) -> Tree {
        match spec {
            Spec::Marker(marker) => {
                self.registry
                    .register(path.clone(), marker.default_value().clone());

                // A persisted value replaces the whole subtree, whatever its shape.
                let (value, source) = match self.persisted.get(&path) {
                    Some(stored) => (Tree::from(stored.clone()), Source::Persisted),
                    None => (marker.default_value().clone(), Source::Default),
                };
                log::debug!("Bound '{}' ({:?})", path, source);

                self.bindings.push(Binding {
                    field,
                    path,
                    source,
                });
                value
            }
            Spec::Nested(stencil) => self.walk_fields(&stencil.fields, &field, &path),
            Spec::PassThrough(value) => value.clone(),
        }
    }
}

//! Flattening of the live state tree into persisted entries.

use crate::path::compose;
use crate::persistence::codec::FlatState;
use crate::registry::Registry;
use crate::tree::Tree;

/// Collect the registered paths of a live state tree.
///
/// Paths are rebuilt from the tree's own structure (namespaces are already
/// part of the registered paths). A registered value is captured whole,
/// and the walk still descends into it so deeper registered paths are
/// captured too. Array elements are walked with their index as the path
/// segment (`items.0`); scalars end the walk. Values that are
/// [`Tree::Absent`] are dropped here, before encoding.
///
/// A missing or non-object snapshot flattens to an empty map.
pub fn flatten(registry: &Registry, snapshot: Option<&Tree>) -> FlatState {
    let mut out = FlatState::new();
    if let Some(Tree::Object(fields)) = snapshot {
        for (name, value) in fields {
            collect(registry, value, compose([name.as_str()]), &mut out);
        }
    }
    out
}

fn collect(registry: &Registry, node: &Tree, path: String, out: &mut FlatState) {
    if registry.contains(&path) {
        if let Some(value) = node.to_json() {
            out.insert(path.clone(), value);
        }
    }

    match node {
        Tree::Object(children) => {
            for (name, child) in children {
                collect(registry, child, compose([path.as_str(), name.as_str()]), out);
            }
        }
        Tree::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let index = index.to_string();
                collect(registry, item, compose([path.as_str(), index.as_str()]), out);
            }
        }
        _ => {}
    }
}

//! JSON-shaped state values with an explicit "absent" sentinel.
//!
//! `Tree::Absent` is distinct from `Tree::Null`: a field holding `Absent`
//! is present in the live state but has no value, and is never written to
//! storage. `Null` is a real value and round-trips.

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use crate::error::{Result, TattooError};

/// A node in a state, spec, or hydrated tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tree {
    /// Present but without a value.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Tree>),
    /// Fields in insertion order.
    Object(IndexMap<String, Tree>),
}

impl Tree {
    /// Empty object.
    pub fn object() -> Self {
        Tree::Object(IndexMap::new())
    }

    /// Build an object from `(key, value)` pairs.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Tree>,
    {
        Tree::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Convert any serializable value into a tree.
    ///
    /// `Option::None` fields become `Null`, as serde renders them; use
    /// [`Tree::set`] with [`Tree::Absent`] to mark a field absent.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Tree::from)
            .map_err(TattooError::Encode)
    }

    /// Deserialize this tree into a typed value (absent fields are omitted).
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json().unwrap_or(Value::Null)).map_err(TattooError::Decode)
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Tree::Absent)
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Tree::Object(_))
    }

    /// Children of an object node.
    pub fn as_object(&self) -> Option<&IndexMap<String, Tree>> {
        match self {
            Tree::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Child of an object node by field name, or of an array node by index.
    pub fn get(&self, field: &str) -> Option<&Tree> {
        match self {
            Tree::Object(map) => map.get(field),
            Tree::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Follow a dotted path through nested objects and arrays.
    pub fn pointer(&self, path: &str) -> Option<&Tree> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, field| node.get(field))
    }

    /// Set a field on an object node, turning a non-object into an empty
    /// object first. Returns the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Tree>) -> Option<Tree> {
        if !self.is_object() {
            *self = Tree::object();
        }
        match self {
            Tree::Object(map) => map.insert(field.into(), value.into()),
            _ => None,
        }
    }

    /// Builder form of [`Tree::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.set(field, value);
        self
    }

    /// Encode to JSON. `None` for `Absent`; absent object entries are
    /// omitted and absent array elements become `null`.
    pub fn to_json(&self) -> Option<Value> {
        let value = match self {
            Tree::Absent => return None,
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(*b),
            Tree::Number(n) => Value::Number(n.clone()),
            Tree::String(s) => Value::String(s.clone()),
            Tree::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(Value::Null))
                    .collect(),
            ),
            Tree::Object(map) => Value::Object(
                map.iter()
                    .filter_map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect(),
            ),
        };
        Some(value)
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(s),
            Value::Array(items) => Tree::Array(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => {
                Tree::Object(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(s.to_string())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::String(s)
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Bool(b)
    }
}

impl From<i64> for Tree {
    fn from(n: i64) -> Self {
        Tree::Number(n.into())
    }
}

impl From<u64> for Tree {
    fn from(n: u64) -> Self {
        Tree::Number(n.into())
    }
}

impl From<f64> for Tree {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Tree::Number).unwrap_or(Tree::Null)
    }
}

impl<T: Into<Tree>> From<Option<T>> for Tree {
    /// `None` maps to `Absent`, not `Null`.
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Tree::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_absent_is_dropped_from_objects() {
        let tree = Tree::from(json!({"a": 1, "b": null})).with("c", Tree::Absent);
        assert_eq!(tree.to_json(), Some(json!({"a": 1, "b": null})));
    }

    #[test]
    fn test_absent_array_element_becomes_null() {
        let tree = Tree::Array(vec![Tree::from(1_i64), Tree::Absent]);
        assert_eq!(tree.to_json(), Some(json!([1, null])));
    }

    #[test]
    fn test_absent_root_has_no_json() {
        assert_eq!(Tree::Absent.to_json(), None);
        assert_eq!(Tree::Null.to_json(), Some(Value::Null));
    }

    #[test]
    fn test_option_none_is_absent() {
        assert_eq!(Tree::from(None::<&str>), Tree::Absent);
        assert_eq!(Tree::from(Some("x")), Tree::from("x"));
    }

    #[test]
    fn test_pointer_walks_objects() {
        let tree = Tree::from(json!({"app": {"info": {"telephone": 9}}}));
        assert_eq!(
            tree.pointer("app.info.telephone"),
            Some(&Tree::from(json!(9)))
        );
        assert_eq!(tree.pointer("app.missing"), None);
    }

    #[test]
    fn test_objects_keep_insertion_order() {
        let tree = Tree::object().with("b", 1_i64).with("a", 2_i64).with("b", 3_i64);
        let text = serde_json::to_string(&tree.to_json().unwrap()).unwrap();
        assert_eq!(text, r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn test_pointer_indexes_arrays() {
        let tree = Tree::from(json!({"items": [{"id": 1}, {"id": 2}]}));
        assert_eq!(tree.pointer("items.1.id"), Some(&Tree::from(2_i64)));
        assert_eq!(tree.pointer("items.2"), None);
        assert_eq!(tree.pointer("items.first"), None);
    }

    #[test]
    fn test_set_replaces_scalar_with_object() {
        let mut tree = Tree::from(5_i64);
        tree.set("a", "x");
        assert_eq!(tree.to_json(), Some(json!({"a": "x"})));
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Info {
            telephone: Option<u64>,
            address: String,
        }

        let info = Info {
            telephone: Some(90008000),
            address: "camelcase str".into(),
        };
        let tree = Tree::from_serialize(&info).unwrap();
        assert_eq!(tree.deserialize::<Info>().unwrap(), info);
    }
}

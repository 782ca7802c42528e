//! Encoding of the flat persisted state.
//!
//! The persisted store is one JSON object mapping structural paths to
//! values. Keys keep the order they were inserted in, which for a
//! flattened state is the pre-order of the live tree.

use serde_json::{Map, Value};

use crate::error::{Result, TattooError};
use crate::platform::Storage;

/// Structural path → last written value.
pub type FlatState = Map<String, Value>;

/// Encode a flat state as JSON text.
pub fn encode(state: &FlatState) -> Result<String> {
    serde_json::to_string(state).map_err(TattooError::Encode)
}

/// Decode JSON text into a flat state. The top level must be an object.
pub fn decode(text: &str, key: &str) -> Result<FlatState> {
    match serde_json::from_str::<Value>(text).map_err(TattooError::Decode)? {
        Value::Object(map) => Ok(map),
        _ => Err(TattooError::NotAnObject {
            key: key.to_string(),
        }),
    }
}

/// Read the persisted store under `key`.
///
/// Any failure degrades to an empty store: declarations then fall back to
/// their defaults.
pub fn read_persisted(storage: &dyn Storage, key: &str) -> FlatState {
    let text = match storage.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return FlatState::new(),
        Err(e) => {
            log::warn!("Could not read persisted state '{}': {}", key, e);
            return FlatState::new();
        }
    };

    match decode(&text, key) {
        Ok(state) => {
            log::info!("Loaded {} persisted values from '{}'", state.len(), key);
            state
        }
        Err(e) => {
            log::warn!("Discarding unreadable persisted state '{}': {}", key, e);
            FlatState::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_encode_keeps_insertion_order() {
        let mut state = FlatState::new();
        state.insert("app.username".into(), json!("foo"));
        state.insert("app.info".into(), json!({"telephone": 1, "address": ""}));
        assert_eq!(
            encode(&state).unwrap(),
            r#"{"app.username":"foo","app.info":{"telephone":1,"address":""}}"#
        );
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode("[1, 2]", "k"),
            Err(TattooError::NotAnObject { .. })
        ));
        assert!(matches!(decode("{", "k"), Err(TattooError::Decode(_))));
    }

    #[test]
    fn test_read_persisted_degrades_to_empty() {
        let corrupt = MemoryStorage::with_item("k", "{not json");
        assert!(read_persisted(&corrupt, "k").is_empty());

        let missing = MemoryStorage::new();
        assert!(read_persisted(&missing, "k").is_empty());

        let scalar = MemoryStorage::with_item("k", "42");
        assert!(read_persisted(&scalar, "k").is_empty());
    }

    #[test]
    fn test_read_persisted_keeps_nulls() {
        let storage = MemoryStorage::with_item("k", r#"{"a.b": null, "c": 9.99}"#);
        let state = read_persisted(&storage, "k");
        assert_eq!(state.get("a.b"), Some(&Value::Null));
        assert_eq!(state.get("c"), Some(&json!(9.99)));
    }
}

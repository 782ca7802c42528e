//! Browser LocalStorage backend (wasm32 only).

use super::Storage;
use crate::error::{Result, TattooError};

/// `window.localStorage`, looked up on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(operation: &'static str, key: &str) -> Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| TattooError::storage(operation, key, "LocalStorage unavailable"))
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Self::storage("get", key)?
            .get_item(key)
            .map_err(|e| TattooError::storage("get", key, format!("{:?}", e)))
    }

    fn set(&self, key: &str, text: &str) -> Result<()> {
        Self::storage("set", key)?
            .set_item(key, text)
            .map_err(|e| TattooError::storage("set", key, format!("{:?}", e)))?;
        log::debug!("LocalStorage '{}' updated ({} bytes)", key, text.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::storage("remove", key)?
            .remove_item(key)
            .map_err(|e| TattooError::storage("remove", key, format!("{:?}", e)))
    }
}

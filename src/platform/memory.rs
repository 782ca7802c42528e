//! In-memory storage backend.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::Storage;
use crate::error::{Result, TattooError};

/// Map-backed storage that can also simulate write failures.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    /// Number of upcoming `set` calls that fail.
    failing_writes: Mutex<u32>,
    writes: Mutex<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one entry.
    pub fn with_item(key: &str, text: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.items.lock().insert(key.to_string(), text.into());
        storage
    }

    /// Make the next `count` writes fail with a storage error.
    pub fn fail_next_writes(&self, count: u32) {
        *self.failing_writes.lock() = count;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set(&self, key: &str, text: &str) -> Result<()> {
        {
            let mut failing = self.failing_writes.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(TattooError::storage("set", key, "simulated write failure"));
            }
        }
        self.items.lock().insert(key.to_string(), text.to_string());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "{}").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_simulated_failures_run_out() {
        let storage = MemoryStorage::new();
        storage.fail_next_writes(2);

        assert!(storage.set("k", "a").is_err());
        assert!(storage.set("k", "b").is_err());
        storage.set("k", "c").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("c"));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let storage = MemoryStorage::with_item("k", "v");
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }
}

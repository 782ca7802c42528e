//! Platform abstraction layer
//!
//! Storage backends behind one key/value-of-strings trait:
//! - `MemoryStorage`: in-process map (tests, demos)
//! - `FileStorage`: one JSON file per key (native)
//! - `LocalStorage`: browser LocalStorage (wasm32)

pub mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub mod file;

#[cfg(target_arch = "wasm32")]
pub mod local_storage;

pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorage;

use crate::error::Result;

/// Synchronous string key/value storage.
///
/// Methods take `&self` so one backend can be shared between the stencil
/// engine (reads at declaration time) and a persistor (writes on change).
pub trait Storage {
    /// Text stored under `key`, or `None` when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the text stored under `key`.
    fn set(&self, key: &str, text: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, text: &str) -> Result<()> {
        (**self).set(key, text)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

//! Tattoo - selective, path-addressed persistence of application state
//!
//! A [`Stencil`] declares which fields of a state tree survive restarts by
//! wrapping them in markers. Declaring it registers each marker's dotted
//! path and hydrates a working tree from storage; an attached [`Persistor`]
//! then writes just those paths back on every state change.
//!
//! Core modules:
//! - `path`: Dotted structural path composition
//! - `registry`: Shared set of persistable paths and their defaults
//! - `stencil`: Declaration and hydration
//! - `persistence`: Flattening, encoding, and writes on change
//! - `platform`: Storage backends (memory, file, LocalStorage on web)
//! - `store`: State container trait and a minimal store
//! - `settings`: Storage key, retry, and debounce configuration
//!
//! ```
//! use std::sync::Arc;
//! use tattoo::{MemoryStorage, PersistSettings, Persistor, Registry, Spec, Stencil, Storage, Store, Tree};
//!
//! let registry = Registry::new();
//! let storage = Arc::new(MemoryStorage::new());
//! let settings = PersistSettings::default();
//!
//! let hydration = Stencil::new()
//!     .field("username", Spec::marker("unknown"))
//!     .field("theme", Spec::value("dark"))
//!     .declare(Some("app"), &registry, &storage, &settings);
//!
//! let store = Store::new(Some(Tree::object().with("app", hydration.into_tree())));
//! tattoo::attach(&store, &Persistor::new(registry, storage.clone(), settings));
//!
//! store.update(|state| {
//!     state.set("app", Tree::object().with("username", "batman").with("theme", "light"));
//! })?;
//! assert_eq!(
//!     storage.get("tattoo_storage_key")?.as_deref(),
//!     Some(r#"{"app.username":"batman"}"#)
//! );
//! # Ok::<(), tattoo::TattooError>(())
//! ```

pub mod error;
pub mod path;
pub mod persistence;
pub mod platform;
pub mod registry;
pub mod settings;
pub mod stencil;
pub mod store;
pub mod tree;

pub use error::{Result, TattooError};
pub use path::{compose, compose_with};
pub use persistence::{Attachment, FlatState, Persistor, attach, flatten};
pub use platform::{MemoryStorage, Storage};
pub use registry::Registry;
pub use settings::{DEFAULT_STORAGE_KEY, DebounceConfig, PersistSettings, RetryPolicy};
pub use stencil::{Binding, Hydration, Marker, Source, Spec, Stencil, declare};
pub use store::{ListenerId, StateContainer, Store};
pub use tree::Tree;

#[cfg(not(target_arch = "wasm32"))]
pub use platform::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use platform::LocalStorage;

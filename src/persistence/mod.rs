//! Selective persistence of live state
//!
//! - `codec`: flat `{path: value}` JSON blob, degraded reads
//! - `flatten`: live tree → registered paths only, sentinels dropped
//! - `persistor`: write-on-change with retry and optional debounce

pub mod codec;
pub mod flatten;
pub mod persistor;

pub use codec::{FlatState, decode, encode, read_persisted};
pub use flatten::flatten;
pub use persistor::{Attachment, Persistor, attach};

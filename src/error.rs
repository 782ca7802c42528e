//! Error types for storage reads/writes and encoding.
//!
//! Reads never surface these to callers of `declare`: a failed read degrades
//! to an empty persisted store. Writes propagate them to whoever triggered
//! the state change.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence error.
#[derive(Debug, Error)]
pub enum TattooError {
    /// A storage backend rejected a get/set/remove.
    #[error("storage {operation} failed for key '{key}': {message}")]
    Storage {
        operation: &'static str,
        key: String,
        message: String,
    },

    /// File-backed storage I/O error.
    #[error("failed to {operation} {}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The flattened state could not be encoded.
    #[error("failed to encode persisted state")]
    Encode(#[source] serde_json::Error),

    /// Persisted text could not be decoded.
    #[error("failed to decode persisted state")]
    Decode(#[source] serde_json::Error),

    /// Persisted text decoded, but not to a flat object.
    #[error("persisted state under '{key}' is not an object")]
    NotAnObject { key: String },

    /// Every write attempt failed.
    #[error("gave up writing '{key}' after {attempts} attempts")]
    RetriesExhausted {
        key: String,
        attempts: u32,
        #[source]
        source: Box<TattooError>,
    },
}

impl TattooError {
    /// Shorthand for a backend failure carrying a plain message.
    pub fn storage(operation: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, TattooError>;

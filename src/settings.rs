//! Persistence settings
//!
//! Storage key, write retry policy, and write debounce. Defaults give the
//! plain write-through behaviour: one attempt per state change, no delay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TattooError};
use crate::platform::Storage;

/// Storage key shared by every declaration and persistor in a process.
pub const DEFAULT_STORAGE_KEY: &str = "tattoo_storage_key";

/// Retry policy for storage writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total write attempts (1 = no retry).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Growth factor applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 50,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Retry up to `max_attempts` total attempts without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            ..Default::default()
        }
    }

    /// Attempts actually made (a zero setting still writes once).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_backoff_ms as f64 * factor) as u64)
    }
}

/// Write debouncing.
///
/// Timing uses `std::time::Instant`, so keep it disabled on wasm32.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// When disabled every change is written immediately.
    pub enabled: bool,

    /// Quiet period after the latest change before writing.
    pub debounce_ms: u64,

    /// Upper bound on how long the first unsaved change may wait.
    pub max_delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl DebounceConfig {
    /// Enabled debounce with the given windows.
    pub fn window(debounce_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            enabled: true,
            debounce_ms,
            max_delay_ms,
        }
    }

    /// Whether a pending write is due.
    pub fn should_write(&self, since_last_change_ms: u64, since_first_unsaved_ms: u64) -> bool {
        if !self.enabled {
            return true;
        }
        since_last_change_ms >= self.debounce_ms || since_first_unsaved_ms >= self.max_delay_ms
    }
}

/// Settings shared by the stencil engine and persistors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistSettings {
    /// Key of the single persisted blob.
    pub storage_key: String,
    pub retry: RetryPolicy,
    pub debounce: DebounceConfig,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            retry: RetryPolicy::default(),
            debounce: DebounceConfig::default(),
        }
    }
}

impl PersistSettings {
    /// Settings writing under a different key.
    pub fn with_storage_key(key: impl Into<String>) -> Self {
        Self {
            storage_key: key.into(),
            ..Default::default()
        }
    }

    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(TattooError::Decode)
    }

    /// Load settings stored under `key`, falling back to defaults.
    pub fn load(storage: &dyn Storage, key: &str) -> Self {
        match storage.get(key) {
            Ok(Some(text)) => match Self::from_json(&text) {
                Ok(settings) => {
                    log::info!("Loaded persistence settings from '{}'", key);
                    return settings;
                }
                Err(e) => log::warn!("Ignoring unreadable settings under '{}': {}", key, e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings under '{}': {}", key, e),
        }

        log::info!("Using default persistence settings");
        Self::default()
    }

    /// Store these settings under `key`.
    pub fn save(&self, storage: &dyn Storage, key: &str) -> Result<()> {
        let text = serde_json::to_string(self).map_err(TattooError::Encode)?;
        storage.set(key, &text)?;
        log::info!("Persistence settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStorage;

    #[test]
    fn test_defaults_are_write_through() {
        let settings = PersistSettings::default();
        assert_eq!(settings.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(settings.retry.attempts(), 1);
        assert!(!settings.debounce.enabled);
        assert!(settings.debounce.should_write(0, 0));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings =
            PersistSettings::from_json(r#"{"retry": {"max_attempts": 4}}"#).unwrap();
        assert_eq!(settings.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(settings.retry.max_attempts, 4);
        assert_eq!(settings.retry.initial_backoff_ms, 50);
    }

    #[test]
    fn test_backoff_grows() {
        let retry = RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 10,
            multiplier: 3.0,
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(10));
        assert_eq!(retry.backoff(2), Duration::from_millis(30));
        assert_eq!(retry.backoff(3), Duration::from_millis(90));
        assert_eq!(RetryPolicy::immediate(3).backoff(2), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_still_writes_once() {
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }

    #[test]
    fn test_debounce_window() {
        let debounce = DebounceConfig::window(1000, 10_000);

        // Rapid changes
        assert!(!debounce.should_write(200, 5000));
        // Quiet period passed
        assert!(debounce.should_write(1200, 1200));
        // Max delay forces a write
        assert!(debounce.should_write(200, 12_000));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let storage = MemoryStorage::with_item("settings", "not json");
        assert_eq!(PersistSettings::load(&storage, "settings"), PersistSettings::default());
        assert_eq!(PersistSettings::load(&storage, "missing"), PersistSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();
        let settings = PersistSettings {
            debounce: DebounceConfig::window(250, 2000),
            ..PersistSettings::with_storage_key("my_app")
        };
        settings.save(&storage, "settings").unwrap();
        assert_eq!(PersistSettings::load(&storage, "settings"), settings);
    }
}

//! Factory configuration via `bindstore.toml`
//!
//! A host keeps one `bindstore.toml` next to its data. On first start a
//! commented default file can be written with
//! [`StoreConfig::write_default_if_missing`]; settings take effect the next
//! time a [`StoreFactory`](crate::StoreFactory) is built from the file.

use bindstore_core::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name placed in the host's data directory.
pub const CONFIG_FILE_NAME: &str = "bindstore.toml";

/// Default persistence queue depth per store.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Store factory configuration loaded from `bindstore.toml`.
///
/// # Example
///
/// ```toml
/// preferences_dir = "preferences"
/// persistence_queue_depth = 1024
/// hydrate = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of local-preferences suites.
    #[serde(default = "default_preferences_dir")]
    pub preferences_dir: PathBuf,
    /// Pending saves a store queues before it starts coalescing them.
    #[serde(default = "default_queue_depth")]
    pub persistence_queue_depth: usize,
    /// Load each store's snapshot from its backend at construction.
    #[serde(default = "default_hydrate")]
    pub hydrate: bool,
}

fn default_preferences_dir() -> PathBuf {
    PathBuf::from("preferences")
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

fn default_hydrate() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            preferences_dir: default_preferences_dir(),
            persistence_queue_depth: default_queue_depth(),
            hydrate: default_hydrate(),
        }
    }
}

impl StoreConfig {
    /// Config with preferences rooted at `dir` and defaults elsewhere.
    pub fn with_preferences_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            preferences_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue depth is zero.
    pub fn validate(&self) -> StoreResult<()> {
        if self.persistence_queue_depth == 0 {
            return Err(StoreError::config(
                "persistence_queue_depth must be at least 1",
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# bindstore configuration
#
# Root directory for local-preferences stores. Each suite is a
# subdirectory; each scope is one JSON file inside it.
preferences_dir = "preferences"

# Pending saves queued per store before newer snapshots replace
# older queued ones (default: 1024).
persistence_queue_depth = 1024

# Load persisted snapshots when a store is created (default: true).
hydrate = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            StoreError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> StoreResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                StoreError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> StoreResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StoreError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            StoreError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

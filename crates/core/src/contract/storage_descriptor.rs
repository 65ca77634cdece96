//! Storage descriptors
//!
//! A [`StorageDescriptor`] names the persistence strategy for a store. It is
//! part of the store's identity: the factory keys its registry by
//! `(Scope, StorageDescriptor)`.
//!
//! | Descriptor | Survives restart | Backing |
//! |------------|------------------|---------|
//! | `Memory` | no | process memory |
//! | `LocalPreferences` | yes | per-suite JSON file under the preferences root |
//! | `File` | yes | JSON file under the given directory |
//! | `Remote` | yes | caller-supplied transport |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Persistence strategy for a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageDescriptor {
    /// In-memory only
    Memory,
    /// Local preferences, optionally in a named suite
    LocalPreferences {
        /// Suite name; `None` selects the default suite
        suite: Option<String>,
    },
    /// JSON files under a directory
    File {
        /// Directory holding one file per scope
        path: PathBuf,
    },
    /// Remote document service
    Remote {
        /// Remote namespace
        namespace: String,
    },
}

impl StorageDescriptor {
    /// Default local preferences suite
    pub fn preferences() -> Self {
        StorageDescriptor::LocalPreferences { suite: None }
    }

    /// Named local preferences suite
    pub fn preferences_suite(suite: impl Into<String>) -> Self {
        StorageDescriptor::LocalPreferences {
            suite: Some(suite.into()),
        }
    }

    /// File storage under `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StorageDescriptor::File { path: path.into() }
    }

    /// Remote storage in `namespace`
    pub fn remote(namespace: impl Into<String>) -> Self {
        StorageDescriptor::Remote {
            namespace: namespace.into(),
        }
    }

    /// True if data written through this descriptor survives a restart
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageDescriptor::Memory)
    }
}

impl fmt::Display for StorageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDescriptor::Memory => write!(f, "memory"),
            StorageDescriptor::LocalPreferences { suite: None } => write!(f, "preferences"),
            StorageDescriptor::LocalPreferences { suite: Some(s) } => {
                write!(f, "preferences:{}", s)
            }
            StorageDescriptor::File { path } => write!(f, "file:{}", path.display()),
            StorageDescriptor::Remote { namespace } => write!(f, "remote:{}", namespace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence() {
        assert!(!StorageDescriptor::Memory.is_persistent());
        assert!(StorageDescriptor::preferences().is_persistent());
        assert!(StorageDescriptor::file("/tmp/x").is_persistent());
        assert!(StorageDescriptor::remote("ns").is_persistent());
    }

    #[test]
    fn test_identity() {
        assert_eq!(StorageDescriptor::preferences(), StorageDescriptor::preferences());
        assert_ne!(
            StorageDescriptor::preferences(),
            StorageDescriptor::preferences_suite("group")
        );
        assert_ne!(StorageDescriptor::file("/a"), StorageDescriptor::file("/b"));
    }

    #[test]
    fn test_display() {
        assert_eq!(StorageDescriptor::Memory.to_string(), "memory");
        assert_eq!(
            StorageDescriptor::preferences_suite("g").to_string(),
            "preferences:g"
        );
        assert_eq!(StorageDescriptor::remote("ns").to_string(), "remote:ns");
    }
}

//! Local preferences backend
//!
//! Preferences are grouped into suites. Each suite is a directory under the
//! preferences root and each scope gets one JSON document inside it:
//!
//! ```text
//! <root>/
//! ├── default/app.json
//! └── <suite>/scenario.<escaped id>.json
//! ```

use crate::backend::StorageBackend;
use crate::backends::file::JsonFileBackend;
use bindstore_core::{StoreResult, Value};
use std::path::{Path, PathBuf};

/// Suite directory used when none is named
pub const DEFAULT_SUITE: &str = "default";

/// Backend storing a scope's snapshot in a preferences suite
#[derive(Debug, Clone)]
pub struct PreferencesBackend {
    suite: String,
    file: JsonFileBackend,
}

impl PreferencesBackend {
    /// Backend for `namespace` in `suite` under `root`
    pub fn new(root: &Path, suite: Option<&str>, namespace: &str) -> Self {
        let suite = suite.unwrap_or(DEFAULT_SUITE).to_string();
        let file = JsonFileBackend::in_dir(&root.join(&suite), namespace);
        PreferencesBackend { suite, file }
    }

    /// Suite name
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// File holding the snapshot
    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

impl StorageBackend for PreferencesBackend {
    fn load(&self) -> StoreResult<Option<Value>> {
        self.file.load()
    }

    fn save(&self, root: &Value) -> StoreResult<()> {
        self.file.save(root)
    }

    fn describe(&self) -> String {
        format!("preferences:{}", self.suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_suite_layout() {
        let dir = TempDir::new().unwrap();
        let backend = PreferencesBackend::new(dir.path(), None, "app");
        assert_eq!(backend.suite(), DEFAULT_SUITE);
        assert_eq!(backend.path(), dir.path().join("default").join("app.json"));
    }

    #[test]
    fn test_suites_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = PreferencesBackend::new(dir.path(), Some("a"), "app");
        let b = PreferencesBackend::new(dir.path(), Some("b"), "app");
        a.save(&r#"{"x": 1}"#.parse().unwrap()).unwrap();
        assert!(a.load().unwrap().is_some());
        assert_eq!(b.load().unwrap(), None);
    }
}

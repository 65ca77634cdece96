//! JSON file backend
//!
//! Stores the snapshot as one JSON document. Writes are atomic: the document
//! is written to a sibling temp file, synced, then renamed over the target,
//! so a crash mid-save leaves the previous snapshot intact.

use crate::backend::StorageBackend;
use bindstore_core::{StoreError, StoreResult, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Backend persisting the snapshot to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Backend writing to exactly `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    /// Backend writing `<dir>/<namespace>.json`
    pub fn in_dir(dir: &Path, namespace: &str) -> Self {
        JsonFileBackend {
            path: dir.join(format!("{}.json", namespace)),
        }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> StoreResult<Option<Value>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "bindstore::storage", path = %self.path.display(), "No snapshot on disk");
                return Ok(None);
            }
            Err(e) => {
                return Err(StoreError::backend(format!(
                    "failed to read '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let root: Value = text.parse().map_err(|e| {
            StoreError::backend(format!(
                "corrupt snapshot '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(root))
    }

    fn save(&self, root: &Value) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let payload = serde_json::to_vec(root)
            .map_err(|e| StoreError::backend(format!("serialize error: {}", e)))?;

        // Atomic write: temp + fsync + rename
        let tmp_path = self.tmp_path();
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

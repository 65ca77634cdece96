//! In-memory backend
//!
//! Keeps the last saved snapshot in process memory. Data does not survive a
//! restart, and an evicted store's fresh backend starts empty.

use crate::backend::StorageBackend;
use bindstore_core::{StoreResult, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Backend holding the snapshot in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Mutex<Option<Value>>,
    saves: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that will hydrate with `root`
    pub fn with_snapshot(root: Value) -> Self {
        MemoryBackend {
            saved: Mutex::new(Some(root)),
            saves: AtomicU64::new(0),
        }
    }

    /// Last saved snapshot
    pub fn saved(&self) -> Option<Value> {
        self.saved.lock().clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Acquire)
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> StoreResult<Option<Value>> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, root: &Value) -> StoreResult<()> {
        *self.saved.lock() = Some(root.clone());
        self.saves.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_empty() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load().unwrap(), None);
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let backend = MemoryBackend::new();
        let root: Value = r#"{"a": 1}"#.parse().unwrap();
        backend.save(&root).unwrap();
        assert_eq!(backend.load().unwrap(), Some(root.clone()));
        assert_eq!(backend.saved(), Some(root));
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_with_snapshot() {
        let backend = MemoryBackend::with_snapshot(Value::object());
        assert_eq!(backend.load().unwrap(), Some(Value::object()));
    }
}

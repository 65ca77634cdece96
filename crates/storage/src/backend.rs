//! Storage backend contract
//!
//! A backend persists one full snapshot of a store's root object. Stores call
//! it only from their persistence worker, never from caller threads, so an
//! implementation may block on I/O freely.
//!
//! | Call | When |
//! |------|------|
//! | `load` | once, when the store hydrates |
//! | `save` | after every committed mutation or transaction |

use bindstore_core::{StoreResult, Value};

/// Pluggable persistence for a store's root object
pub trait StorageBackend: Send + Sync {
    /// Load the last saved root.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> StoreResult<Option<Value>>;

    /// Persist `root`, replacing whatever was saved before
    fn save(&self, root: &Value) -> StoreResult<()>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

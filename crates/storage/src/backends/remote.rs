//! Remote document backend
//!
//! Snapshots are pushed to and fetched from a remote document service through
//! a [`RemoteTransport`]. The transport is injected by the host application;
//! without one, every load and save fails with `BackendUnavailable` and the
//! store keeps working purely in memory.
//!
//! Documents are keyed `<namespace>/<scope>`, so two namespaces never share a
//! document even for the same scope.

use crate::backend::StorageBackend;
use bindstore_core::{StoreError, StoreResult, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Connection to a remote document service
pub trait RemoteTransport: Send + Sync {
    /// Fetch the document stored under `key`, or `None` if absent
    fn fetch(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Store `doc` under `key`, replacing any previous document
    fn push(&self, key: &str, doc: &Value) -> StoreResult<()>;
}

/// Backend syncing a scope's snapshot through a remote transport
pub struct RemoteBackend {
    key: String,
    transport: Option<Arc<dyn RemoteTransport>>,
}

impl RemoteBackend {
    /// Backend for `scope` under `namespace`
    pub fn new(
        namespace: &str,
        scope: &str,
        transport: Option<Arc<dyn RemoteTransport>>,
    ) -> Self {
        RemoteBackend {
            key: format!("{}/{}", namespace, scope),
            transport,
        }
    }

    /// Remote document key
    pub fn key(&self) -> &str {
        &self.key
    }

    fn transport(&self) -> StoreResult<&Arc<dyn RemoteTransport>> {
        self.transport.as_ref().ok_or_else(|| {
            StoreError::backend(format!("no remote transport configured for '{}'", self.key))
        })
    }
}

impl StorageBackend for RemoteBackend {
    fn load(&self) -> StoreResult<Option<Value>> {
        self.transport()?.fetch(&self.key)
    }

    fn save(&self, root: &Value) -> StoreResult<()> {
        self.transport()?.push(&self.key, root)
    }

    fn describe(&self) -> String {
        format!("remote:{}", self.key)
    }
}

/// In-process document service
///
/// Useful for tests and for hosts that want remote semantics without a
/// network. Can be switched offline to simulate an unreachable service.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    docs: Mutex<HashMap<String, Value>>,
    offline: Mutex<bool>,
}

impl MemoryTransport {
    /// Create an empty, online transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (`true`) or succeed again (`false`)
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Document currently stored under `key`
    pub fn document(&self, key: &str) -> Option<Value> {
        self.docs.lock().get(key).cloned()
    }

    /// Stored document keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.docs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_online(&self) -> StoreResult<()> {
        if *self.offline.lock() {
            return Err(StoreError::backend("remote service unreachable"));
        }
        Ok(())
    }
}

impl RemoteTransport for MemoryTransport {
    fn fetch(&self, key: &str) -> StoreResult<Option<Value>> {
        self.check_online()?;
        Ok(self.docs.lock().get(key).cloned())
    }

    fn push(&self, key: &str, doc: &Value) -> StoreResult<()> {
        self.check_online()?;
        self.docs.lock().insert(key.to_string(), doc.clone());
        Ok(())
    }
}

//! Store factory and registry
//!
//! The factory guarantees one [`Store`] per `(Scope, StorageDescriptor)`:
//! asking twice for the same pair returns the same instance. It is an
//! ordinary value owned by the host and handed to whatever needs stores;
//! two factories never share stores.
//!
//! The registry lock is held only for lookups, insertions and removals. It is
//! never taken while a store's own lock is held, and resets release it before
//! touching the evicted stores.

use crate::config::StoreConfig;
use crate::store::Store;
use bindstore_core::{Scope, StorageDescriptor, StoreError, StoreResult, Value};
use bindstore_storage::{open_backend, BackendContext, RemoteTransport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry identity of a store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Scope the store belongs to
    pub scope: Scope,
    /// Persistence strategy
    pub storage: StorageDescriptor,
}

/// Owner of every store's lifecycle
pub struct StoreFactory {
    config: StoreConfig,
    backends: BackendContext,
    stores: Mutex<HashMap<StoreKey, Arc<Store>>>,
}

impl StoreFactory {
    /// Factory using `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let backends = BackendContext::new(config.preferences_dir.clone());
        Ok(StoreFactory {
            config,
            backends,
            stores: Mutex::new(HashMap::new()),
        })
    }

    /// Factory configured from a `bindstore.toml` file
    pub fn from_config_file(path: &Path) -> StoreResult<Self> {
        Self::new(StoreConfig::from_file(path)?)
    }

    /// Use `transport` for every remote store created from now on
    pub fn with_remote_transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.backends = self.backends.with_remote(transport);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return the store for `(scope, storage)`, creating it on first use
    pub fn make_store(&self, scope: Scope, storage: StorageDescriptor) -> StoreResult<Arc<Store>> {
        let key = StoreKey { scope, storage };

        // Hold the registry lock across creation so two callers racing on the
        // same key cannot both build a store.
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(&key) {
            return Ok(Arc::clone(store));
        }

        let backend = open_backend(&key.scope, &key.storage, &self.backends);
        let store = Arc::new(Store::with_backend(
            key.scope.clone(),
            key.storage.clone(),
            backend,
            &self.config,
        )?);
        info!(target: "bindstore::factory", scope = %key.scope, storage = %key.storage, "Registered store");
        stores.insert(key, Arc::clone(&store));
        Ok(store)
    }

    /// Registered store for `(scope, storage)`, without creating one
    pub fn get_store(&self, scope: &Scope, storage: &StorageDescriptor) -> Option<Arc<Store>> {
        let key = StoreKey {
            scope: scope.clone(),
            storage: storage.clone(),
        };
        self.stores.lock().get(&key).cloned()
    }

    /// Number of registered stores
    pub fn store_count(&self) -> usize {
        self.stores.lock().len()
    }

    /// Registry keys, in no particular order
    pub fn keys(&self) -> Vec<StoreKey> {
        self.stores.lock().keys().cloned().collect()
    }

    /// Clear and evict every store registered under `scope`
    ///
    /// Each store's root is replaced with an empty object, the clearing save
    /// is waited for, and the store's persistence is shut down. Handles still
    /// held elsewhere keep working in memory but no longer persist.
    ///
    /// Returns the number of stores evicted.
    pub fn reset_stores(&self, scope: &Scope) -> StoreResult<usize> {
        let evicted = {
            let mut stores = self.stores.lock();
            let keys: Vec<StoreKey> = stores
                .keys()
                .filter(|k| &k.scope == scope)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| stores.remove(&k))
                .collect::<Vec<_>>()
        };
        info!(target: "bindstore::factory", %scope, count = evicted.len(), "Resetting stores");
        Self::clear_and_close(evicted)
    }

    /// Clear and evict every registered store
    pub fn reset_all_stores(&self) -> StoreResult<usize> {
        let evicted: Vec<Arc<Store>> = self.stores.lock().drain().map(|(_, s)| s).collect();
        info!(target: "bindstore::factory", count = evicted.len(), "Resetting all stores");
        Self::clear_and_close(evicted)
    }

    fn clear_and_close(evicted: Vec<Arc<Store>>) -> StoreResult<usize> {
        let count = evicted.len();
        let mut first_error: Option<StoreError> = None;
        for store in evicted {
            let cleared = store
                .replace_all(Value::object())
                .and_then(|()| store.flush());
            if let Err(e) = cleared {
                warn!(
                    target: "bindstore::factory",
                    scope = %store.scope(),
                    storage = %store.storage(),
                    error = %e,
                    "Failed to clear store during reset"
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            store.close();
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }
}

impl std::fmt::Debug for StoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFactory")
            .field("config", &self.config)
            .field("stores", &self.store_count())
            .finish()
    }
}

//! The path-addressed store
//!
//! A [`Store`] owns one root object, one persistence worker and one change
//! bus. Every operation, reads included, runs under the store's state lock,
//! which gives each store linearizable semantics:
//!
//! - a mutation applies, records its patch, queues a snapshot and broadcasts
//!   its [`Change`] before the lock is released
//! - a subscription is seeded under the same lock, so no change can slip in
//!   between the seed and live delivery
//!
//! Persistence never blocks a caller. Backend failures are logged and
//! recorded in [`PersistenceStatus`], never returned from a mutation.

use crate::config::StoreConfig;
use crate::persist::{PersistWorker, PersistenceStatus};
use crate::subscription::{read_many, Subscriber, Subscribers, Subscription};
use crate::transaction::Transaction;
use bindstore_core::{
    navigator, Change, KeyPath, Patch, PatchOp, Scope, StorageDescriptor, StoreError, StoreResult, Value,
};
use bindstore_storage::StorageBackend;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};
use std::thread::ThreadId;
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// Path arguments
// ============================================================================

/// Anything a store method accepts as a path
///
/// Text is parsed on every call; pass a [`KeyPath`] to parse once.
pub trait AsKeyPath {
    /// Borrow or parse the path
    fn as_key_path(&self) -> StoreResult<Cow<'_, KeyPath>>;
}

impl AsKeyPath for KeyPath {
    fn as_key_path(&self) -> StoreResult<Cow<'_, KeyPath>> {
        Ok(Cow::Borrowed(self))
    }
}

impl AsKeyPath for str {
    fn as_key_path(&self) -> StoreResult<Cow<'_, KeyPath>> {
        Ok(Cow::Owned(KeyPath::parse(self)?))
    }
}

impl AsKeyPath for String {
    fn as_key_path(&self) -> StoreResult<Cow<'_, KeyPath>> {
        self.as_str().as_key_path()
    }
}

impl<T: AsKeyPath + ?Sized> AsKeyPath for &T {
    fn as_key_path(&self) -> StoreResult<Cow<'_, KeyPath>> {
        (**self).as_key_path()
    }
}

// ============================================================================
// Wire conversions for typed access
// ============================================================================

/// Decode against the wire form first, then against the plain view in which
/// `Color` and `Url` leaves read as strings
pub(crate) fn decode_value<T: DeserializeOwned>(path: &KeyPath, value: Value) -> StoreResult<T> {
    let tagged = serde_json::to_value(&value)
        .map_err(|e| StoreError::decode(path.to_string(), e.to_string()))?;
    match serde_json::from_value(tagged) {
        Ok(decoded) => Ok(decoded),
        Err(e) => serde_json::from_value(value.to_plain_json())
            .map_err(|_| StoreError::decode(path.to_string(), e.to_string())),
    }
}

pub(crate) fn encode_value<T: Serialize + ?Sized>(path: &KeyPath, value: &T) -> StoreResult<Value> {
    serde_json::to_value(value)
        .map(Value::from_json)
        .map_err(|e| StoreError::invalid_value(format!("cannot encode value for '{}': {}", path, e)))
}

// ============================================================================
// State
// ============================================================================

/// Everything guarded by the store lock
pub(crate) struct StoreState {
    pub(crate) root: Value,
    pub(crate) subscribers: Subscribers,
    next_sequence: u64,
    /// Patches committed while the hydration load is still queued
    pending_hydration: Option<Vec<Patch>>,
}

impl StoreState {
    fn new(hydrate: bool) -> Self {
        StoreState {
            root: Value::object(),
            subscribers: Subscribers::default(),
            next_sequence: 1,
            pending_hydration: if hydrate { Some(Vec::new()) } else { None },
        }
    }

    pub(crate) fn read(&self, path: &KeyPath) -> Option<Value> {
        navigator::get(path, &self.root).cloned()
    }

    pub(crate) fn apply_set(&mut self, path: &KeyPath, value: Value) -> StoreResult<Patch> {
        value.validate_depth()?;
        if path.is_root() {
            return self.apply_replace(value);
        }
        let (root, old) = navigator::set(path, value.clone(), std::mem::take(&mut self.root));
        self.root = root;
        Ok(Patch::set(path.clone(), old, value))
    }

    pub(crate) fn apply_merge(&mut self, path: &KeyPath, fragment: Value) -> StoreResult<Patch> {
        fragment.validate_depth()?;
        if path.is_root() && !fragment.is_object() {
            return Err(StoreError::invalid_value(format!(
                "cannot merge {} into the root object",
                fragment.type_name()
            )));
        }
        let (root, old) = navigator::merge(path, fragment.clone(), std::mem::take(&mut self.root));
        self.root = root;
        Ok(Patch::merge(path.clone(), old, fragment))
    }

    /// `None` when nothing was at `path`
    pub(crate) fn apply_remove(&mut self, path: &KeyPath) -> Option<Patch> {
        if path.is_root() {
            let old = std::mem::replace(&mut self.root, Value::object());
            return Some(Patch::remove(KeyPath::root(), Some(old)));
        }
        navigator::get(path, &self.root)?;
        let (root, removed) = navigator::remove(path, std::mem::take(&mut self.root));
        self.root = root;
        Some(Patch::remove(path.clone(), removed))
    }

    pub(crate) fn apply_replace(&mut self, root: Value) -> StoreResult<Patch> {
        if !root.is_object() {
            return Err(StoreError::invalid_value(format!(
                "root must be an object, got {}",
                root.type_name()
            )));
        }
        root.validate_depth()?;
        let old = std::mem::replace(&mut self.root, root.clone());
        Ok(Patch::set(KeyPath::root(), Some(old), root))
    }

    /// Stamp and broadcast a change
    fn emit(&mut self, patches: Vec<Patch>, transaction_id: Option<Uuid>) -> Arc<Change> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if let Some(pending) = self.pending_hydration.as_mut() {
            pending.extend(patches.iter().cloned());
        }
        let change = Arc::new(Change::new(patches, transaction_id, sequence));
        self.subscribers.broadcast(&change, &self.root);
        change
    }
}

// ============================================================================
// Store
// ============================================================================

pub(crate) struct StoreInner {
    scope: Scope,
    storage: StorageDescriptor,
    label: String,
    state: Mutex<StoreState>,
    txn_owner: Mutex<Option<ThreadId>>,
    persist: PersistWorker,
}

impl StoreInner {
    /// Reject calls made from inside one of this store's transaction bodies
    fn enter(&self) -> StoreResult<()> {
        if self.held_by_current_thread() {
            return Err(StoreError::NestedTransaction);
        }
        Ok(())
    }

    fn held_by_current_thread(&self) -> bool {
        *self.txn_owner.lock() == Some(std::thread::current().id())
    }

    /// Broadcast and queue a snapshot; caller holds the state lock
    fn commit(&self, state: &mut StoreState, patches: Vec<Patch>, transaction_id: Option<Uuid>) {
        let change = state.emit(patches, transaction_id);
        debug!(
            target: "bindstore::store",
            store = %self.label,
            sequence = change.sequence,
            patches = change.len(),
            transaction = change.is_transaction(),
            "Committed change"
        );
        self.persist.save(state.root.clone());
    }

    /// Finish hydration with the loaded root, if any
    ///
    /// Changes committed before the load completed are replayed on top of
    /// the loaded root, and the merged root supersedes their queued saves.
    fn hydrate(&self, loaded: Option<Value>) {
        let mut state = self.state.lock();
        let pending = state.pending_hydration.take().unwrap_or_default();
        let Some(loaded) = loaded else {
            return;
        };
        let replayed = pending.len();
        let root = pending.iter().fold(loaded, replay);
        let old = std::mem::replace(&mut state.root, root.clone());
        state.emit(vec![Patch::set(KeyPath::root(), Some(old), root.clone())], None);
        if replayed > 0 {
            debug!(
                target: "bindstore::store",
                store = %self.label,
                replayed,
                "Replayed early changes over hydrated root"
            );
            self.persist.supersede_saves(root);
        }
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        // Inside a transaction body the lock is already held; the dead
        // entry is pruned on its next delivery instead.
        if self.held_by_current_thread() {
            return;
        }
        self.state.lock().subscribers.remove(id);
    }
}

/// Re-apply a committed patch to `root`
fn replay(root: Value, patch: &Patch) -> Value {
    match (patch.op, patch.path.is_root()) {
        (PatchOp::Set, true) => patch.new_value.clone().unwrap_or_else(Value::object),
        (PatchOp::Remove, true) => Value::object(),
        (PatchOp::Set, false) => {
            let value = patch.new_value.clone().unwrap_or(Value::Null);
            navigator::set(&patch.path, value, root).0
        }
        (PatchOp::Merge, _) => {
            let fragment = patch.new_value.clone().unwrap_or_else(Value::object);
            navigator::merge(&patch.path, fragment, root).0
        }
        (PatchOp::Remove, false) => navigator::remove(&patch.path, root).0,
    }
}

/// Marks the current thread as running a transaction on a store
struct OwnerGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<'a> OwnerGuard<'a> {
    fn claim(owner: &'a Mutex<Option<ThreadId>>) -> Self {
        *owner.lock() = Some(std::thread::current().id());
        OwnerGuard { owner }
    }
}

impl<'a> Drop for OwnerGuard<'a> {
    fn drop(&mut self) {
        *self.owner.lock() = None;
    }
}

/// A reactive, path-addressed document
///
/// Obtain stores from a [`StoreFactory`](crate::StoreFactory), or build a
/// standalone one over any backend with [`Store::with_backend`].
///
/// # Example
///
/// ```text
/// store.set("user.name", "Alice")?;
/// store.set("user.age", 30)?;
/// assert_eq!(store.get("user.name")?, Some(Value::from("Alice")));
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store over `backend` and queue its hydration.
    pub fn with_backend(
        scope: Scope,
        storage: StorageDescriptor,
        backend: Arc<dyn StorageBackend>,
        config: &StoreConfig,
    ) -> StoreResult<Self> {
        let label = format!("{}@{}", scope, storage);
        let persist =
            PersistWorker::spawn(label.clone(), backend, config.persistence_queue_depth)?;
        let inner = Arc::new(StoreInner {
            scope,
            storage,
            label,
            state: Mutex::new(StoreState::new(config.hydrate)),
            txn_owner: Mutex::new(None),
            persist,
        });

        if config.hydrate {
            let weak = Arc::downgrade(&inner);
            inner.persist.hydrate(Box::new(move |loaded: Option<Value>| {
                weak.upgrade().map_or(false, |inner| {
                    inner.hydrate(loaded);
                    true
                })
            }))?;
        }

        info!(target: "bindstore::store", store = %inner.label, hydrate = config.hydrate, "Created store");
        Ok(Store { inner })
    }

    /// Scope this store belongs to
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Storage descriptor this store was created with
    pub fn storage(&self) -> &StorageDescriptor {
        &self.inner.storage
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Value at `path`, or `None` if the path does not resolve
    pub fn get<P: AsKeyPath>(&self, path: P) -> StoreResult<Option<Value>> {
        self.inner.enter()?;
        let path = path.as_key_path()?;
        Ok(self.inner.state.lock().read(&path))
    }

    /// True if `path` resolves to a value (including `Null`)
    pub fn exists<P: AsKeyPath>(&self, path: P) -> StoreResult<bool> {
        self.inner.enter()?;
        let path = path.as_key_path()?;
        Ok(navigator::get(&path, &self.inner.state.lock().root).is_some())
    }

    /// Value at `path` decoded into `T`
    ///
    /// `Color` and `Url` values decode into `String` (or any string-shaped
    /// type) as their text; `T = Value` keeps them as they are.
    ///
    /// # Errors
    ///
    /// `DecodeFailure` if a value exists but does not fit `T`.
    pub fn get_as<T: DeserializeOwned, P: AsKeyPath>(&self, path: P) -> StoreResult<Option<T>> {
        let path = path.as_key_path()?;
        match self.get(&*path)? {
            Some(value) => decode_value(&path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Copy of the whole root object
    pub fn snapshot(&self) -> StoreResult<Value> {
        self.inner.enter()?;
        Ok(self.inner.state.lock().root.clone())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Write `value` at `path`, creating containers along the way
    pub fn set<P: AsKeyPath, V: Into<Value>>(&self, path: P, value: V) -> StoreResult<()> {
        self.inner.enter()?;
        let path = path.as_key_path()?;
        let value = value.into();
        let mut state = self.inner.state.lock();
        let patch = state.apply_set(&path, value)?;
        self.inner.commit(&mut state, vec![patch], None);
        Ok(())
    }

    /// Encode `value` with serde and write it at `path`
    pub fn set_as<P: AsKeyPath, T: Serialize + ?Sized>(&self, path: P, value: &T) -> StoreResult<()> {
        let path = path.as_key_path()?;
        let value = encode_value(&path, value)?;
        self.set(&*path, value)
    }

    /// Shallow-merge `fragment` into the value at `path`
    pub fn merge<P: AsKeyPath, V: Into<Value>>(&self, path: P, fragment: V) -> StoreResult<()> {
        self.inner.enter()?;
        let path = path.as_key_path()?;
        let fragment = fragment.into();
        let mut state = self.inner.state.lock();
        let patch = state.apply_merge(&path, fragment)?;
        self.inner.commit(&mut state, vec![patch], None);
        Ok(())
    }

    /// Remove the value at `path` and return it
    ///
    /// A missing path is a no-op: no change is emitted and nothing is saved.
    /// Removing the root resets it to an empty object.
    pub fn remove<P: AsKeyPath>(&self, path: P) -> StoreResult<Option<Value>> {
        self.inner.enter()?;
        let path = path.as_key_path()?;
        let mut state = self.inner.state.lock();
        match state.apply_remove(&path) {
            Some(patch) => {
                let removed = patch.old_value.clone();
                self.inner.commit(&mut state, vec![patch], None);
                Ok(removed)
            }
            None => Ok(None),
        }
    }

    /// Replace the whole root; emits one change at the root path
    pub fn replace_all(&self, root: Value) -> StoreResult<()> {
        self.inner.enter()?;
        let mut state = self.inner.state.lock();
        let patch = state.apply_replace(root)?;
        self.inner.commit(&mut state, vec![patch], None);
        Ok(())
    }

    /// Run `f` as one atomic unit
    ///
    /// Every mutation made through the handle is delivered as a single
    /// [`Change`] with a fresh transaction id. If `f` returns an error the
    /// root is rolled back and nothing is emitted or saved. Calling back into
    /// this store from `f` fails with `NestedTransaction`.
    ///
    /// # Example
    ///
    /// ```text
    /// store.transaction(|txn| {
    ///     txn.set("cart.total", 42)?;
    ///     txn.remove("cart.pending")?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> StoreResult<T>,
    {
        self.inner.enter()?;
        let mut state = self.inner.state.lock();
        let _owner = OwnerGuard::claim(&self.inner.txn_owner);

        let mut txn = Transaction::new(&mut state);
        match f(&mut txn) {
            Ok(value) => {
                let patches = txn.finish();
                if !patches.is_empty() {
                    self.inner.commit(&mut state, patches, Some(Uuid::new_v4()));
                }
                Ok(value)
            }
            Err(e) => {
                drop(txn);
                debug!(target: "bindstore::store", store = %self.inner.label, error = %e, "Transaction rolled back");
                Err(e)
            }
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Observe the value at `path`
    ///
    /// The current value is delivered first, then the new value after every
    /// change touching a related path.
    pub fn subscribe<P: AsKeyPath>(&self, path: P) -> StoreResult<Subscription<Option<Value>>> {
        self.inner.enter()?;
        let path = path.as_key_path()?.into_owned();
        let (tx, rx) = mpsc::channel();
        let mut state = self.inner.state.lock();
        let id = state.subscribers.next_id();
        if tx.send(state.read(&path)).is_ok() {
            state.subscribers.push(Subscriber::Path { id, path, tx });
        }
        Ok(Subscription::new(id, rx, Arc::downgrade(&self.inner)))
    }

    /// Observe several paths at once
    ///
    /// Each delivery is the full map of canonical path to current value.
    pub fn subscribe_many<I, P>(
        &self,
        paths: I,
    ) -> StoreResult<Subscription<BTreeMap<String, Option<Value>>>>
    where
        I: IntoIterator<Item = P>,
        P: AsKeyPath,
    {
        self.inner.enter()?;
        let mut parsed: Vec<KeyPath> = Vec::new();
        for path in paths {
            let path = path.as_key_path()?.into_owned();
            if !parsed.contains(&path) {
                parsed.push(path);
            }
        }
        let (tx, rx) = mpsc::channel();
        let mut state = self.inner.state.lock();
        let id = state.subscribers.next_id();
        if tx.send(read_many(&parsed, &state.root)).is_ok() {
            state.subscribers.push(Subscriber::Many {
                id,
                paths: parsed,
                tx,
            });
        }
        Ok(Subscription::new(id, rx, Arc::downgrade(&self.inner)))
    }

    /// Raw feed of every change, starting with the next one
    pub fn changes(&self) -> StoreResult<Subscription<Arc<Change>>> {
        self.inner.enter()?;
        let (tx, rx) = mpsc::channel();
        let mut state = self.inner.state.lock();
        let id = state.subscribers.next_id();
        state.subscribers.push(Subscriber::Feed { id, tx });
        Ok(Subscription::new(id, rx, Arc::downgrade(&self.inner)))
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> StoreResult<usize> {
        self.inner.enter()?;
        Ok(self.inner.state.lock().subscribers.len())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Block until every queued load and save has run
    pub fn flush(&self) -> StoreResult<()> {
        self.inner.enter()?;
        self.inner.persist.flush();
        Ok(())
    }

    /// Persistence health
    pub fn persistence_status(&self) -> PersistenceStatus {
        self.inner.persist.status()
    }

    /// True once the store's persistence has been shut down
    pub fn is_closed(&self) -> bool {
        self.inner.persist.is_shut_down()
    }

    /// Drain and stop persistence; later mutations stay in memory only
    pub(crate) fn close(&self) {
        self.inner.persist.shutdown();
        info!(target: "bindstore::store", store = %self.inner.label, "Closed store");
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.inner.persist.shutdown();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("scope", &self.inner.scope)
            .field("storage", &self.inner.storage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindstore_storage::MemoryBackend;

    fn store() -> Store {
        Store::with_backend(
            Scope::App,
            StorageDescriptor::Memory,
            Arc::new(MemoryBackend::new()),
            &StoreConfig::default(),
        )
        .unwrap()
    }

    fn json(text: &str) -> Value {
        text.parse().unwrap()
    }

    #[test]
    fn test_nested_set_builds_objects() {
        let store = store();
        store.set("user.name", "Alice").unwrap();
        store.set("user.age", 30).unwrap();
        assert_eq!(
            store.get("user").unwrap(),
            Some(json(r#"{"name": "Alice", "age": 30}"#))
        );
    }

    #[test]
    fn test_sparse_array_append() {
        let store = store();
        store.set("items[0]", "a").unwrap();
        store.set("items[2]", "c").unwrap();
        assert_eq!(store.snapshot().unwrap()["items"], json(r#"["a", null, "c"]"#));
    }

    #[test]
    fn test_get_missing_and_malformed() {
        let store = store();
        assert_eq!(store.get("nope.deeper").unwrap(), None);
        assert!(!store.exists("nope").unwrap());
        assert!(store.get("a..b").unwrap_err().is_invalid_value());
        assert!(store.set("[0]", 1).unwrap_err().is_invalid_value());
    }

    #[test]
    fn test_exists_for_null() {
        let store = store();
        store.set("flag", Value::Null).unwrap();
        assert!(store.exists("flag").unwrap());
        assert_eq!(store.get("flag").unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_get_as_typed() {
        let store = store();
        store.set("count", 3).unwrap();
        store.set("label", "three").unwrap();
        assert_eq!(store.get_as::<i64, _>("count").unwrap(), Some(3));
        assert_eq!(store.get_as::<String, _>("missing").unwrap(), None);
        let err = store.get_as::<i64, _>("label").unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_get_as_reads_color_and_url_as_text() {
        let store = store();
        store.set("theme.accent", Value::detect("#ff8800")).unwrap();
        store.set("theme.logo", Value::detect("https://example.com/logo.png")).unwrap();

        assert_eq!(
            store.get_as::<String, _>("theme.accent").unwrap(),
            Some("#ff8800".to_string())
        );
        assert_eq!(
            store.get_as::<String, _>("theme.logo").unwrap(),
            Some("https://example.com/logo.png".to_string())
        );
        assert_eq!(
            store.get_as::<Value, _>("theme.accent").unwrap(),
            Some(Value::Color("#ff8800".to_string()))
        );

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Theme {
            accent: String,
            logo: String,
        }
        assert_eq!(
            store.get_as::<Theme, _>("theme").unwrap(),
            Some(Theme {
                accent: "#ff8800".to_string(),
                logo: "https://example.com/logo.png".to_string(),
            })
        );
        assert!(store.get_as::<i64, _>("theme.accent").unwrap_err().is_decode_failure());
    }

    #[test]
    fn test_set_as_serializes() {
        #[derive(Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Profile {
            name: String,
            tags: Vec<String>,
        }
        let store = store();
        let profile = Profile {
            name: "Bob".into(),
            tags: vec!["a".into()],
        };
        store.set_as("profile", &profile).unwrap();
        assert_eq!(store.get("profile.tags[0]").unwrap(), Some(Value::from("a")));
        assert_eq!(store.get_as::<Profile, _>("profile").unwrap(), Some(profile));
    }

    #[test]
    fn test_merge_is_shallow() {
        let store = store();
        store.set("o", json(r#"{"a": 1, "b": {"x": 1}}"#)).unwrap();
        store.merge("o", json(r#"{"b": {"y": 2}, "c": 3}"#)).unwrap();
        assert_eq!(
            store.get("o").unwrap(),
            Some(json(r#"{"a": 1, "b": {"y": 2}, "c": 3}"#))
        );
    }

    #[test]
    fn test_root_must_stay_object() {
        let store = store();
        assert!(store.replace_all(Value::Int(1)).unwrap_err().is_invalid_value());
        assert!(store.set("", "text").unwrap_err().is_invalid_value());
        assert!(store.merge("", Value::array()).unwrap_err().is_invalid_value());
        store.set("", json(r#"{"fresh": true}"#)).unwrap();
        assert_eq!(store.snapshot().unwrap(), json(r#"{"fresh": true}"#));
    }

    #[test]
    fn test_remove_root_resets() {
        let store = store();
        store.set("a", 1).unwrap();
        let removed = store.remove("").unwrap();
        assert_eq!(removed, Some(json(r#"{"a": 1}"#)));
        assert_eq!(store.snapshot().unwrap(), Value::object());
    }

    #[test]
    fn test_remove_missing_emits_nothing() {
        let store = store();
        let feed = store.changes().unwrap();
        assert_eq!(store.remove("ghost").unwrap(), None);
        assert!(feed.try_recv().is_none());
        store.flush().unwrap();
        assert_eq!(store.persistence_status().saves_completed, 0);
    }

    #[test]
    fn test_changes_are_sequenced() {
        let store = store();
        let feed = store.changes().unwrap();
        store.set("a", 1).unwrap();
        store.set("b", 2).unwrap();
        let first = feed.try_recv().unwrap();
        let second = feed.try_recv().unwrap();
        assert!(second.sequence > first.sequence);
        assert!(!first.is_transaction());
        assert_eq!(first.patches[0].path.to_string(), "a");
    }

    #[test]
    fn test_replace_all_patch_at_root() {
        let store = store();
        store.set("old", true).unwrap();
        let feed = store.changes().unwrap();
        store.replace_all(json(r#"{"new": true}"#)).unwrap();
        let change = feed.try_recv().unwrap();
        assert_eq!(change.len(), 1);
        let patch = &change.patches[0];
        assert!(patch.path.is_root());
        assert_eq!(patch.old_value, Some(json(r#"{"old": true}"#)));
        assert_eq!(patch.new_value, Some(json(r#"{"new": true}"#)));
    }

    #[test]
    fn test_too_deep_value_rejected() {
        let store = store();
        let mut value = Value::Int(0);
        for _ in 0..=bindstore_core::MAX_NESTING_DEPTH {
            value = Value::from(vec![value]);
        }
        assert!(store.set("deep", value).unwrap_err().is_invalid_value());
    }

    #[test]
    fn test_hydration_disabled() {
        let backend = Arc::new(MemoryBackend::with_snapshot(json(r#"{"persisted": 1}"#)));
        let config = StoreConfig {
            hydrate: false,
            ..StoreConfig::default()
        };
        let store =
            Store::with_backend(Scope::App, StorageDescriptor::Memory, backend, &config).unwrap();
        store.flush().unwrap();
        assert_eq!(store.snapshot().unwrap(), Value::object());
        assert!(!store.persistence_status().hydrated);
    }
}

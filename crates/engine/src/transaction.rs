//! Transaction handle
//!
//! A [`Transaction`] is the mutation handle passed to the body of
//! [`Store::transaction`](crate::Store::transaction). It works directly on
//! the locked store state and sees its own writes. Patches accumulate until
//! the body returns; the store then emits them as one change.
//!
//! The root is cloned lazily before the first mutation. If the handle is
//! dropped without being finished (the body failed or panicked), the clone
//! is put back.

use crate::store::{decode_value, encode_value, AsKeyPath, StoreState};
use bindstore_core::{navigator, Patch, StoreResult, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Mutation handle for a running transaction
pub struct Transaction<'a> {
    state: &'a mut StoreState,
    original: Option<Value>,
    patches: Vec<Patch>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(state: &'a mut StoreState) -> Self {
        Transaction {
            state,
            original: None,
            patches: Vec::new(),
        }
    }

    fn checkpoint(&mut self) {
        if self.original.is_none() {
            self.original = Some(self.state.root.clone());
        }
    }

    /// Value at `path`, including writes made earlier in this transaction
    pub fn get<P: AsKeyPath>(&self, path: P) -> StoreResult<Option<Value>> {
        let path = path.as_key_path()?;
        Ok(self.state.read(&path))
    }

    /// True if `path` resolves to a value
    pub fn exists<P: AsKeyPath>(&self, path: P) -> StoreResult<bool> {
        let path = path.as_key_path()?;
        Ok(navigator::get(&path, &self.state.root).is_some())
    }

    /// Value at `path` decoded into `T`
    pub fn get_as<T: DeserializeOwned, P: AsKeyPath>(&self, path: P) -> StoreResult<Option<T>> {
        let path = path.as_key_path()?;
        match self.state.read(&path) {
            Some(value) => decode_value(&path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Copy of the root as this transaction currently sees it
    pub fn snapshot(&self) -> Value {
        self.state.root.clone()
    }

    /// Write `value` at `path`
    pub fn set<P: AsKeyPath, V: Into<Value>>(&mut self, path: P, value: V) -> StoreResult<()> {
        let path = path.as_key_path()?;
        self.checkpoint();
        let patch = self.state.apply_set(&path, value.into())?;
        self.patches.push(patch);
        Ok(())
    }

    /// Encode `value` with serde and write it at `path`
    pub fn set_as<P: AsKeyPath, T: Serialize + ?Sized>(
        &mut self,
        path: P,
        value: &T,
    ) -> StoreResult<()> {
        let path = path.as_key_path()?;
        let value = encode_value(&path, value)?;
        self.set(&*path, value)
    }

    /// Shallow-merge `fragment` into the value at `path`
    pub fn merge<P: AsKeyPath, V: Into<Value>>(&mut self, path: P, fragment: V) -> StoreResult<()> {
        let path = path.as_key_path()?;
        self.checkpoint();
        let patch = self.state.apply_merge(&path, fragment.into())?;
        self.patches.push(patch);
        Ok(())
    }

    /// Remove the value at `path`; a missing path records nothing
    pub fn remove<P: AsKeyPath>(&mut self, path: P) -> StoreResult<Option<Value>> {
        let path = path.as_key_path()?;
        self.checkpoint();
        match self.state.apply_remove(&path) {
            Some(patch) => {
                let removed = patch.old_value.clone();
                self.patches.push(patch);
                Ok(removed)
            }
            None => Ok(None),
        }
    }

    /// Replace the whole root
    pub fn replace_all(&mut self, root: Value) -> StoreResult<()> {
        self.checkpoint();
        let patch = self.state.apply_replace(root)?;
        self.patches.push(patch);
        Ok(())
    }

    /// Patches recorded so far
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Keep the changes and hand back the recorded patches
    pub(crate) fn finish(mut self) -> Vec<Patch> {
        self.original = None;
        std::mem::take(&mut self.patches)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.state.root = original;
        }
    }
}

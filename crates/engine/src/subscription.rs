//! Subscriptions
//!
//! Each subscription owns the receiving end of an `mpsc` channel; the store
//! keeps the sending end in its subscriber list and feeds it while holding
//! the store lock. That gives every subscriber the store's commit order and
//! makes the initial seed and live delivery a single ordered stream.
//!
//! A [`Subscription`] holds only a weak reference to its store. Cancelling
//! or dropping it removes its entry from the store; an entry whose receiver
//! has gone away is pruned the next time a delivery to it fails.

use crate::store::StoreInner;
use bindstore_core::{navigator, Change, KeyPath, Value};
use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Current values of several paths, keyed by canonical path text
pub(crate) fn read_many(paths: &[KeyPath], root: &Value) -> BTreeMap<String, Option<Value>> {
    paths
        .iter()
        .map(|p| (p.to_string(), navigator::get(p, root).cloned()))
        .collect()
}

/// One registered observer
pub(crate) enum Subscriber {
    Path {
        id: u64,
        path: KeyPath,
        tx: Sender<Option<Value>>,
    },
    Many {
        id: u64,
        paths: Vec<KeyPath>,
        tx: Sender<BTreeMap<String, Option<Value>>>,
    },
    Feed {
        id: u64,
        tx: Sender<Arc<Change>>,
    },
}

impl Subscriber {
    fn id(&self) -> u64 {
        match self {
            Subscriber::Path { id, .. } | Subscriber::Many { id, .. } | Subscriber::Feed { id, .. } => *id,
        }
    }

    /// Deliver `change`; false once the receiver is gone
    fn deliver(&self, change: &Arc<Change>, root: &Value) -> bool {
        match self {
            Subscriber::Path { path, tx, .. } => {
                if !change.affects(path) {
                    return true;
                }
                tx.send(navigator::get(path, root).cloned()).is_ok()
            }
            Subscriber::Many { paths, tx, .. } => {
                if !paths.iter().any(|p| change.affects(p)) {
                    return true;
                }
                tx.send(read_many(paths, root)).is_ok()
            }
            Subscriber::Feed { tx, .. } => tx.send(Arc::clone(change)).is_ok(),
        }
    }
}

/// Subscriber list guarded by the store lock
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Vec<Subscriber>,
    next_id: u64,
}

impl Subscribers {
    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn push(&mut self, subscriber: Subscriber) {
        self.entries.push(subscriber);
    }

    pub(crate) fn remove(&mut self, id: u64) {
        self.entries.retain(|s| s.id() != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deliver to every subscriber in registration order, pruning dead ones
    pub(crate) fn broadcast(&mut self, change: &Arc<Change>, root: &Value) {
        self.entries.retain(|s| s.deliver(change, root));
    }
}

/// Handle to a live subscription
///
/// Events are buffered until read. Reading methods return `None` once the
/// store is gone and the buffer is empty.
///
/// The buffer is unbounded so that writers never block on observers and no
/// observer misses a change. A subscription that is kept but never read
/// grows by one event per related change for as long as the store lives:
/// read it, [`drain`](Self::drain) it, or drop it.
pub struct Subscription<T> {
    id: u64,
    rx: Receiver<T>,
    store: Weak<StoreInner>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(id: u64, rx: Receiver<T>, store: Weak<StoreInner>) -> Self {
        Subscription { id, rx, store }
    }

    /// Identifier unique within the store
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, blocking until one arrives
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Next buffered event, if any
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Next event, waiting at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// All buffered events, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// True while the store this subscription observes is alive
    pub fn is_active(&self) -> bool {
        self.store.strong_count() > 0
    }

    /// Stop receiving events
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

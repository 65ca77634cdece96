//! Per-store persistence worker.
//!
//! Every store owns one worker thread that talks to its backend. Callers
//! never block on I/O: a committed mutation enqueues a snapshot and returns.
//! Jobs run strictly FIFO, so the backend always sees snapshots in commit
//! order, and the hydration load is always the first job. Snapshots queued
//! before hydration completes are superseded by the hydrated root.
//!
//! When the queue is full, a new snapshot replaces the newest queued one
//! instead of growing the queue. Only the latest snapshot matters to the
//! backend, so nothing observable is lost.

use bindstore_core::{StoreError, StoreResult, Value};
use bindstore_storage::StorageBackend;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Persistence health of one store.
///
/// Failures never surface from mutating calls; this is where they land.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistenceStatus {
    /// Snapshots the backend accepted.
    pub saves_completed: u64,
    /// Snapshots the backend rejected or that could not be queued.
    pub saves_failed: u64,
    /// Snapshots superseded in the queue before they were written.
    pub saves_coalesced: u64,
    /// Most recent load or save failure.
    pub last_error: Option<StoreError>,
    /// The root reflects what the backend held at construction.
    pub hydrated: bool,
}

impl PersistenceStatus {
    /// True if no load or save has failed yet.
    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }
}

/// Completes hydration with the loaded object, or `None` when there is
/// nothing usable to apply. Returns false if the store is gone.
pub(crate) type HydrateFn = Box<dyn FnOnce(Option<Value>) -> bool + Send>;

enum Job {
    Hydrate(HydrateFn),
    Save(Value),
}

struct QueueState {
    jobs: VecDeque<Job>,
    active: bool,
    shutdown: bool,
}

struct WorkerInner {
    label: String,
    backend: Arc<dyn StorageBackend>,
    queue: Mutex<QueueState>,
    work_ready: Condvar,
    drain_cond: Condvar,
    max_queue_depth: usize,
    status: Mutex<PersistenceStatus>,
}

/// Single-threaded FIFO executor for one store's backend calls.
pub(crate) struct PersistWorker {
    inner: Arc<WorkerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl PersistWorker {
    /// Spawn the worker thread for a store labelled `label`.
    pub(crate) fn spawn(
        label: String,
        backend: Arc<dyn StorageBackend>,
        max_queue_depth: usize,
    ) -> StoreResult<Self> {
        let inner = Arc::new(WorkerInner {
            label,
            backend,
            queue: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                active: false,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            max_queue_depth: max_queue_depth.max(1),
            status: Mutex::new(PersistenceStatus::default()),
        });

        let worker_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(format!("bindstore-persist-{}", inner.label))
            .spawn(move || worker_loop(&worker_inner))
            .map_err(|e| {
                StoreError::backend(format!("failed to spawn persistence worker: {}", e))
            })?;
        let thread_id = handle.thread().id();

        Ok(Self {
            inner,
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Queue the hydration load.
    pub(crate) fn hydrate(&self, apply: HydrateFn) -> StoreResult<()> {
        self.submit(Job::Hydrate(apply))
    }

    /// Queue a snapshot. A closed worker records the failure instead.
    pub(crate) fn save(&self, root: Value) {
        if let Err(e) = self.submit(Job::Save(root)) {
            warn!(target: "bindstore::persist", store = %self.inner.label, error = %e, "Snapshot not queued");
            self.inner.record_save_failure(e);
        }
    }

    /// Replace every queued snapshot with `root`.
    ///
    /// Runs even after shutdown was requested: the worker still drains what
    /// is queued, and `root` must be the last thing it writes.
    pub(crate) fn supersede_saves(&self, root: Value) {
        let dropped = {
            let mut queue = self.inner.queue.lock();
            let before = queue.jobs.len();
            queue.jobs.retain(|j| matches!(j, Job::Hydrate(_)));
            let dropped = before - queue.jobs.len();
            queue.jobs.push_back(Job::Save(root));
            dropped
        };
        if dropped > 0 {
            self.inner.status.lock().saves_coalesced += dropped as u64;
        }
        self.inner.work_ready.notify_one();
    }

    fn submit(&self, job: Job) -> StoreResult<()> {
        let mut coalesced = false;
        {
            let mut queue = self.inner.queue.lock();
            if queue.shutdown {
                return Err(StoreError::closed(format!(
                    "persistence for {} has shut down",
                    self.inner.label
                )));
            }
            match job {
                Job::Save(root) if queue.jobs.len() >= self.inner.max_queue_depth => {
                    let pending = queue.jobs.iter_mut().rev().find_map(|j| match j {
                        Job::Save(pending) => Some(pending),
                        Job::Hydrate(_) => None,
                    });
                    match pending {
                        Some(pending) => {
                            *pending = root;
                            coalesced = true;
                        }
                        None => queue.jobs.push_back(Job::Save(root)),
                    }
                }
                job => queue.jobs.push_back(job),
            }
        }

        if coalesced {
            self.inner.status.lock().saves_coalesced += 1;
        } else {
            self.inner.work_ready.notify_one();
        }
        Ok(())
    }

    /// Block until all queued and in-flight jobs have completed.
    ///
    /// Returns immediately when called from the worker thread itself.
    pub(crate) fn flush(&self) {
        if std::thread::current().id() == self.thread_id {
            return;
        }
        let mut queue = self.inner.queue.lock();
        while !queue.jobs.is_empty() || queue.active {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Stop accepting jobs, run what is queued, and join the thread.
    ///
    /// Idempotent.
    pub(crate) fn shutdown(&self) {
        {
            let mut queue = self.inner.queue.lock();
            queue.shutdown = true;
            self.inner.work_ready.notify_all();
        }

        if std::thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }

    /// True once [`shutdown`](Self::shutdown) has been requested.
    pub(crate) fn is_shut_down(&self) -> bool {
        self.inner.queue.lock().shutdown
    }

    /// Current status snapshot.
    pub(crate) fn status(&self) -> PersistenceStatus {
        self.inner.status.lock().clone()
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl WorkerInner {
    fn run(&self, job: Job) {
        match job {
            Job::Save(root) => match self.backend.save(&root) {
                Ok(()) => {
                    self.status.lock().saves_completed += 1;
                    debug!(target: "bindstore::persist", store = %self.label, "Snapshot saved");
                }
                Err(e) => {
                    warn!(
                        target: "bindstore::persist",
                        store = %self.label,
                        backend = %self.backend.describe(),
                        error = %e,
                        "Save failed"
                    );
                    self.record_save_failure(e);
                }
            },
            Job::Hydrate(apply) => self.hydrate(apply),
        }
    }

    fn hydrate(&self, apply: HydrateFn) {
        match self.backend.load() {
            Ok(None) => {
                apply(None);
                self.status.lock().hydrated = true;
                debug!(target: "bindstore::persist", store = %self.label, "Nothing to hydrate");
            }
            Ok(Some(root)) if root.is_object() => {
                if apply(Some(root)) {
                    self.status.lock().hydrated = true;
                    info!(target: "bindstore::persist", store = %self.label, "Hydrated from backend");
                } else {
                    debug!(
                        target: "bindstore::persist",
                        store = %self.label,
                        "Store dropped before hydration; loaded snapshot discarded"
                    );
                }
            }
            Ok(Some(root)) => {
                apply(None);
                let kind = root.type_name();
                warn!(
                    target: "bindstore::persist",
                    store = %self.label,
                    kind,
                    "Loaded snapshot is not an object; discarded"
                );
                self.status.lock().last_error = Some(StoreError::invalid_value(format!(
                    "loaded snapshot is {}, expected object",
                    kind
                )));
            }
            Err(e) => {
                apply(None);
                warn!(
                    target: "bindstore::persist",
                    store = %self.label,
                    backend = %self.backend.describe(),
                    error = %e,
                    "Load failed"
                );
                self.status.lock().last_error = Some(e);
            }
        }
    }

    fn record_save_failure(&self, e: StoreError) {
        let mut status = self.status.lock();
        status.saves_failed += 1;
        status.last_error = Some(e);
    }
}

/// Clears the active flag and wakes flush waiters, even if a job panics.
struct ActiveJobGuard<'a> {
    inner: &'a WorkerInner,
}

impl<'a> Drop for ActiveJobGuard<'a> {
    fn drop(&mut self) {
        let mut queue = self.inner.queue.lock();
        queue.active = false;
        if queue.jobs.is_empty() {
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &WorkerInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    queue.active = true;
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveJobGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| inner.run(job)))
        {
            let msg = e
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("(non-string panic)");
            error!(target: "bindstore::persist", store = %inner.label, "persistence job panicked: {}", msg);
            inner.record_save_failure(StoreError::backend(format!("persistence job panicked: {}", msg)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindstore_storage::MemoryBackend;
    use std::sync::Barrier;

    /// Backend whose first save blocks on a barrier.
    struct GatedBackend {
        inner: MemoryBackend,
        gate: Arc<Barrier>,
        gated: Mutex<bool>,
    }

    impl StorageBackend for GatedBackend {
        fn load(&self) -> StoreResult<Option<Value>> {
            self.inner.load()
        }

        fn save(&self, root: &Value) -> StoreResult<()> {
            let wait = std::mem::replace(&mut *self.gated.lock(), false);
            if wait {
                self.gate.wait();
            }
            self.inner.save(root)
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    struct FailingBackend;

    impl StorageBackend for FailingBackend {
        fn load(&self) -> StoreResult<Option<Value>> {
            Err(StoreError::backend("disk on fire"))
        }

        fn save(&self, _root: &Value) -> StoreResult<()> {
            Err(StoreError::backend("disk on fire"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn obj(n: i64) -> Value {
        let mut v = Value::object();
        if let Some(map) = v.as_object_mut() {
            map.insert("n".to_string(), Value::Int(n));
        }
        v
    }

    #[test]
    fn test_saves_run_in_order() {
        let backend = Arc::new(MemoryBackend::new());
        let worker = PersistWorker::spawn("t".into(), backend.clone(), 64).unwrap();
        for i in 0..10 {
            worker.save(obj(i));
        }
        worker.flush();
        assert_eq!(backend.saved(), Some(obj(9)));
        assert_eq!(backend.save_count(), 10);
        assert_eq!(worker.status().saves_completed, 10);
        worker.shutdown();
    }

    #[test]
    fn test_full_queue_coalesces() {
        let gate = Arc::new(Barrier::new(2));
        let backend = Arc::new(GatedBackend {
            inner: MemoryBackend::new(),
            gate: Arc::clone(&gate),
            gated: Mutex::new(true),
        });
        let worker = PersistWorker::spawn("t".into(), backend.clone(), 2).unwrap();

        worker.save(obj(0));
        // Wait until the worker holds the first job
        std::thread::sleep(std::time::Duration::from_millis(50));

        worker.save(obj(1));
        worker.save(obj(2));
        worker.save(obj(3));
        worker.save(obj(4));

        gate.wait();
        worker.flush();

        let status = worker.status();
        assert_eq!(status.saves_completed, 3);
        assert_eq!(status.saves_coalesced, 2);
        assert_eq!(backend.inner.saved(), Some(obj(4)));
        worker.shutdown();
    }

    #[test]
    fn test_failures_are_recorded() {
        let worker = PersistWorker::spawn("t".into(), Arc::new(FailingBackend), 8).unwrap();
        worker.hydrate(Box::new(|_: Option<Value>| true)).unwrap();
        worker.save(obj(1));
        worker.flush();

        let status = worker.status();
        assert!(!status.hydrated);
        assert_eq!(status.saves_failed, 1);
        assert!(status.last_error.unwrap().is_backend_unavailable());
        worker.shutdown();
    }

    #[test]
    fn test_hydrate_applies_object() {
        let backend = Arc::new(MemoryBackend::with_snapshot(obj(7)));
        let worker = PersistWorker::spawn("t".into(), backend, 8).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        worker
            .hydrate(Box::new(move |root: Option<Value>| {
                *s.lock() = root;
                true
            }))
            .unwrap();
        worker.flush();
        assert_eq!(*seen.lock(), Some(obj(7)));
        assert!(worker.status().hydrated);
        worker.shutdown();
    }

    #[test]
    fn test_hydrate_rejects_non_object() {
        let backend = Arc::new(MemoryBackend::with_snapshot(Value::Int(3)));
        let worker = PersistWorker::spawn("t".into(), backend, 8).unwrap();
        let seen = Arc::new(Mutex::new(Some(Value::Null)));
        let s = Arc::clone(&seen);
        worker
            .hydrate(Box::new(move |root: Option<Value>| {
                *s.lock() = root;
                true
            }))
            .unwrap();
        worker.flush();
        assert_eq!(*seen.lock(), None);
        let status = worker.status();
        assert!(!status.hydrated);
        assert!(status.last_error.unwrap().is_invalid_value());
        worker.shutdown();
    }

    #[test]
    fn test_refused_hydration_is_not_hydrated() {
        let backend = Arc::new(MemoryBackend::with_snapshot(obj(1)));
        let worker = PersistWorker::spawn("t".into(), backend, 8).unwrap();
        worker.hydrate(Box::new(|_: Option<Value>| false)).unwrap();
        worker.flush();
        let status = worker.status();
        assert!(!status.hydrated);
        assert!(status.is_healthy());
        worker.shutdown();
    }

    #[test]
    fn test_supersede_replaces_queued_saves() {
        let gate = Arc::new(Barrier::new(2));
        let backend = Arc::new(GatedBackend {
            inner: MemoryBackend::new(),
            gate: Arc::clone(&gate),
            gated: Mutex::new(true),
        });
        let worker = PersistWorker::spawn("t".into(), backend.clone(), 64).unwrap();

        worker.save(obj(0));
        std::thread::sleep(std::time::Duration::from_millis(50));
        worker.save(obj(1));
        worker.save(obj(2));
        worker.supersede_saves(obj(9));

        gate.wait();
        worker.flush();

        let status = worker.status();
        assert_eq!(status.saves_completed, 2);
        assert_eq!(status.saves_coalesced, 2);
        assert_eq!(backend.inner.saved(), Some(obj(9)));
        assert_eq!(backend.inner.save_count(), 2);
        worker.shutdown();
    }

    #[test]
    fn test_shutdown_runs_queued_then_rejects() {
        let backend = Arc::new(MemoryBackend::new());
        let worker = PersistWorker::spawn("t".into(), backend.clone(), 64).unwrap();
        for i in 0..5 {
            worker.save(obj(i));
        }
        worker.shutdown();
        assert_eq!(backend.save_count(), 5);
        assert!(worker.is_shut_down());

        worker.save(obj(99));
        let status = worker.status();
        assert_eq!(status.saves_failed, 1);
        assert!(status.last_error.unwrap().is_closed());
        assert_eq!(backend.saved(), Some(obj(4)));

        // Idempotent, and flush on a stopped worker returns
        worker.shutdown();
        worker.flush();
    }
}

//! Store engine for bindstore
//!
//! This crate turns the core value model into live stores:
//! - Store: root object, reads, mutations, typed access
//! - Transaction: atomic batches delivered as one change
//! - Subscriptions: per-path, multi-path and raw change feeds
//! - Persistence worker: one FIFO backend thread per store
//! - StoreFactory: one store per (scope, storage), resets
//! - VersionGate: scope reset on major version change
//! - StoreConfig: `bindstore.toml`
//!
//! Logging uses `tracing` with the targets `bindstore::store`,
//! `bindstore::persist`, `bindstore::factory` and `bindstore::gate`. No
//! subscriber is installed here; that is up to the host.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod factory;
pub mod gate;
pub mod persist;
pub mod store;
pub mod subscription;
pub mod transaction;

pub use config::{StoreConfig, CONFIG_FILE_NAME, DEFAULT_QUEUE_DEPTH};
pub use factory::{StoreFactory, StoreKey};
pub use gate::{FileLedger, GateOutcome, MemoryLedger, VersionGate, VersionLedger};
pub use persist::PersistenceStatus;
pub use store::{AsKeyPath, Store};
pub use subscription::Subscription;
pub use transaction::Transaction;

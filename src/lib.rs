//! bindstore - reactive, path-addressed state store
//!
//! A store holds one JSON-like document that UI components bind to by
//! textual path, observe for changes, and mutate transactionally.
//!
//! # Quick Start
//!
//! ```ignore
//! use bindstore::{Scope, StorageDescriptor, StoreConfig, StoreFactory, Value};
//!
//! let factory = StoreFactory::new(StoreConfig::default())?;
//! let store = factory.make_store(Scope::App, StorageDescriptor::Memory)?;
//!
//! let names = store.subscribe("user.name")?;
//! store.transaction(|txn| {
//!     txn.set("user.name", "Alice")?;
//!     txn.set("user.age", 30)?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(names.recv(), Some(None));
//! assert_eq!(names.recv(), Some(Some(Value::from("Alice"))));
//! ```
//!
//! # Architecture
//!
//! - `bindstore-core`: values, key paths, navigation, patches and changes
//! - `bindstore-storage`: persistence backends
//! - `bindstore-engine`: stores, subscriptions, factory, version gate

pub use bindstore_core::*;
pub use bindstore_engine::*;
pub use bindstore_storage::*;

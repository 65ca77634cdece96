//! Persistence backends for bindstore
//!
//! This crate provides the storage side of a store:
//! - [`StorageBackend`]: the load/save contract every backend implements
//! - Built-in backends: memory, JSON file, local preferences, remote
//! - [`open_backend`]: maps a scope and descriptor onto a backend instance
//!
//! Backends are always driven from a store's persistence worker, so every
//! implementation here is synchronous and may block.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod backends;
pub mod open;

pub use backend::StorageBackend;
pub use backends::{
    JsonFileBackend, MemoryBackend, MemoryTransport, PreferencesBackend, RemoteBackend,
    RemoteTransport, DEFAULT_SUITE,
};
pub use open::{open_backend, BackendContext};

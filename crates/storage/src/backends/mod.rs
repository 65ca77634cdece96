//! Built-in storage backends

pub mod file;
pub mod memory;
pub mod preferences;
pub mod remote;

pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use preferences::{PreferencesBackend, DEFAULT_SUITE};
pub use remote::{MemoryTransport, RemoteBackend, RemoteTransport};

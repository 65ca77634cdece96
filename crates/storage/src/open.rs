//! Backend selection
//!
//! Maps a (scope, descriptor) pair onto a concrete backend instance. The
//! context carries the host-provided pieces a descriptor cannot name on its
//! own: where preferences live and which remote transport to use.

use crate::backend::StorageBackend;
use crate::backends::{
    JsonFileBackend, MemoryBackend, PreferencesBackend, RemoteBackend, RemoteTransport,
};
use bindstore_core::{Scope, StorageDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Host environment for opening backends
#[derive(Clone, Default)]
pub struct BackendContext {
    /// Root directory of preference suites
    pub preferences_dir: PathBuf,
    /// Transport used by remote backends
    pub remote: Option<Arc<dyn RemoteTransport>>,
}

impl BackendContext {
    /// Context rooted at `preferences_dir` with no remote transport
    pub fn new(preferences_dir: impl Into<PathBuf>) -> Self {
        BackendContext {
            preferences_dir: preferences_dir.into(),
            remote: None,
        }
    }

    /// Attach a remote transport
    pub fn with_remote(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.remote = Some(transport);
        self
    }
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("preferences_dir", &self.preferences_dir)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

/// Open the backend `descriptor` names for `scope`
///
/// File descriptors name a directory; each scope gets its own document
/// inside it so scopes sharing a descriptor stay isolated.
pub fn open_backend(
    scope: &Scope,
    descriptor: &StorageDescriptor,
    ctx: &BackendContext,
) -> Arc<dyn StorageBackend> {
    let backend: Arc<dyn StorageBackend> = match descriptor {
        StorageDescriptor::Memory => Arc::new(MemoryBackend::new()),
        StorageDescriptor::LocalPreferences { suite } => Arc::new(PreferencesBackend::new(
            &ctx.preferences_dir,
            suite.as_deref(),
            &scope.namespace(),
        )),
        StorageDescriptor::File { path } => {
            Arc::new(JsonFileBackend::in_dir(path, &scope.namespace()))
        }
        StorageDescriptor::Remote { namespace } => Arc::new(RemoteBackend::new(
            namespace,
            &scope.to_string(),
            ctx.remote.clone(),
        )),
    };
    debug!(target: "bindstore::storage", %scope, backend = %backend.describe(), "Opened backend");
    backend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryTransport;
    use bindstore_core::Value;
    use tempfile::TempDir;

    #[test]
    fn test_file_scopes_are_isolated() {
        let dir = TempDir::new().unwrap();
        let ctx = BackendContext::default();
        let descriptor = StorageDescriptor::file(dir.path());
        let app = open_backend(&Scope::App, &descriptor, &ctx);
        let s1 = open_backend(&Scope::scenario("s1"), &descriptor, &ctx);

        app.save(&r#"{"who": "app"}"#.parse().unwrap()).unwrap();
        s1.save(&r#"{"who": "s1"}"#.parse().unwrap()).unwrap();

        assert_eq!(app.load().unwrap().unwrap()["who"], Value::from("app"));
        assert_eq!(s1.load().unwrap().unwrap()["who"], Value::from("s1"));
    }

    #[test]
    fn test_preferences_use_context_root() {
        let dir = TempDir::new().unwrap();
        let ctx = BackendContext::new(dir.path());
        let backend = open_backend(&Scope::App, &StorageDescriptor::preferences(), &ctx);
        backend.save(&Value::object()).unwrap();
        assert!(dir.path().join("default").join("app.json").exists());
    }

    #[test]
    fn test_remote_uses_context_transport() {
        let transport = Arc::new(MemoryTransport::new());
        let ctx = BackendContext::default().with_remote(transport.clone());
        let backend = open_backend(&Scope::App, &StorageDescriptor::remote("team"), &ctx);
        backend.save(&Value::object()).unwrap();
        assert_eq!(transport.keys(), vec!["team/app".to_string()]);
    }

    #[test]
    fn test_memory_backends_are_independent() {
        let ctx = BackendContext::default();
        let a = open_backend(&Scope::App, &StorageDescriptor::Memory, &ctx);
        let b = open_backend(&Scope::App, &StorageDescriptor::Memory, &ctx);
        a.save(&Value::object()).unwrap();
        assert_eq!(b.load().unwrap(), None);
    }
}

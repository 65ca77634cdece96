//! Version-gated reset
//!
//! A [`VersionGate`] remembers the last application version seen for each
//! scope. When the major component changes, the scope's stores are reset so
//! data written under an incompatible schema is never read back.
//!
//! Only stores registered in the factory are reset. To also clear data
//! persisted by stores that have not been opened yet, name their descriptors
//! with [`VersionGate::tracking`]; the gate opens them before resetting.

use crate::factory::StoreFactory;
use bindstore_core::{Scope, SemanticVersion, StorageDescriptor, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistent record of the last version seen per scope
pub trait VersionLedger: Send + Sync {
    /// Last recorded version for `scope`
    fn recorded(&self, scope: &Scope) -> StoreResult<Option<SemanticVersion>>;

    /// Record `version` as current for `scope`
    fn record(&self, scope: &Scope, version: SemanticVersion) -> StoreResult<()>;
}

/// Ledger kept in process memory
#[derive(Debug, Default)]
pub struct MemoryLedger {
    versions: Mutex<HashMap<Scope, SemanticVersion>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionLedger for MemoryLedger {
    fn recorded(&self, scope: &Scope) -> StoreResult<Option<SemanticVersion>> {
        Ok(self.versions.lock().get(scope).copied())
    }

    fn record(&self, scope: &Scope, version: SemanticVersion) -> StoreResult<()> {
        self.versions.lock().insert(scope.clone(), version);
        Ok(())
    }
}

/// Ledger stored as a JSON object mapping scope to version text
///
/// ```text
/// {"app": "2.1.0", "scenario:onboarding": "1.4.2"}
/// ```
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLedger {
    /// Ledger backed by the file at `path`; created on first record
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLedger {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<BTreeMap<String, SemanticVersion>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            StoreError::backend(format!(
                "corrupt version ledger '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_all(&self, versions: &BTreeMap<String, SemanticVersion>) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let payload = serde_json::to_vec_pretty(versions)
            .map_err(|e| StoreError::backend(format!("serialize error: {}", e)))?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl VersionLedger for FileLedger {
    fn recorded(&self, scope: &Scope) -> StoreResult<Option<SemanticVersion>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(&scope.to_string()).copied())
    }

    fn record(&self, scope: &Scope, version: SemanticVersion) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut versions = self.read_all()?;
        versions.insert(scope.to_string(), version);
        self.write_all(&versions)
    }
}

/// Result of a version check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No version was recorded for the scope
    FirstRun,
    /// Same version as last time
    Unchanged,
    /// Newer minor or patch version
    Upgraded {
        /// Previously recorded version
        from: SemanticVersion,
    },
    /// Older minor or patch version
    Downgraded {
        /// Previously recorded version
        from: SemanticVersion,
    },
    /// Major version changed; the scope's stores were reset
    Reset {
        /// Previously recorded version
        from: SemanticVersion,
        /// Number of stores cleared
        stores_cleared: usize,
    },
}

/// Compares application versions and resets scopes on major changes
pub struct VersionGate {
    ledger: Box<dyn VersionLedger>,
    tracked: Vec<StorageDescriptor>,
}

impl VersionGate {
    /// Gate recording versions in `ledger`
    pub fn new(ledger: impl VersionLedger + 'static) -> Self {
        VersionGate {
            ledger: Box::new(ledger),
            tracked: Vec::new(),
        }
    }

    /// Gate with an in-memory ledger
    pub fn in_memory() -> Self {
        Self::new(MemoryLedger::new())
    }

    /// Also clear `storage` for a scope being reset, even if it is not open
    pub fn tracking(mut self, storage: StorageDescriptor) -> Self {
        if !self.tracked.contains(&storage) {
            self.tracked.push(storage);
        }
        self
    }

    /// Compare `current` with the version last recorded for `scope`
    ///
    /// Records `current` in every case. On a major difference the scope's
    /// stores are reset through `factory` before the new version is
    /// recorded, so an interrupted reset is retried on the next check.
    pub fn check(
        &self,
        factory: &StoreFactory,
        scope: &Scope,
        current: SemanticVersion,
    ) -> StoreResult<GateOutcome> {
        let outcome = match self.ledger.recorded(scope)? {
            None => GateOutcome::FirstRun,
            Some(from) if from == current => GateOutcome::Unchanged,
            Some(from) if from.is_major_change(&current) => {
                for storage in &self.tracked {
                    factory.make_store(scope.clone(), storage.clone())?;
                }
                let stores_cleared = factory.reset_stores(scope)?;
                info!(
                    target: "bindstore::gate",
                    %scope,
                    from = %from,
                    to = %current,
                    stores_cleared,
                    "Major version change; scope reset"
                );
                GateOutcome::Reset {
                    from,
                    stores_cleared,
                }
            }
            Some(from) if from < current => GateOutcome::Upgraded { from },
            Some(from) => GateOutcome::Downgraded { from },
        };

        if outcome != GateOutcome::Unchanged {
            self.ledger.record(scope, current)?;
        }
        debug!(target: "bindstore::gate", %scope, version = %current, ?outcome, "Version checked");
        Ok(outcome)
    }
}

impl std::fmt::Debug for VersionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionGate")
            .field("tracked", &self.tracked)
            .finish()
    }
}

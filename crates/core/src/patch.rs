//! Mutation records
//!
//! A [`Patch`] records one mutation applied to a store's root. A [`Change`]
//! groups one or more patches that subscribers observe as a single
//! notification: a standalone `set`/`merge`/`remove` yields a one-patch
//! change, a transaction yields one change carrying every patch it made.
//!
//! Patches are records, not commands: they are produced after the mutation
//! has been applied, carrying both the previous and the new value so that
//! observers can diff without re-reading the store.

use crate::keypath::KeyPath;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of mutation a patch records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Value written at the path
    Set,
    /// Value removed from the path
    Remove,
    /// Object fragment shallow-merged into the path
    Merge,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Set => write!(f, "SET"),
            PatchOp::Remove => write!(f, "REMOVE"),
            PatchOp::Merge => write!(f, "MERGE"),
        }
    }
}

/// One recorded mutation
///
/// For [`PatchOp::Merge`], `new_value` is the merge fragment, not the merged
/// object. For [`PatchOp::Remove`], `new_value` is always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Kind of mutation
    pub op: PatchOp,
    /// Path the mutation targeted
    pub path: KeyPath,
    /// Value at the path before the mutation, if any
    pub old_value: Option<Value>,
    /// Written value or merge fragment
    pub new_value: Option<Value>,
}

impl Patch {
    /// Record a set
    pub fn set(path: KeyPath, old_value: Option<Value>, new_value: Value) -> Self {
        Patch {
            op: PatchOp::Set,
            path,
            old_value,
            new_value: Some(new_value),
        }
    }

    /// Record a remove
    pub fn remove(path: KeyPath, old_value: Option<Value>) -> Self {
        Patch {
            op: PatchOp::Remove,
            path,
            old_value,
            new_value: None,
        }
    }

    /// Record a merge
    pub fn merge(path: KeyPath, old_value: Option<Value>, fragment: Value) -> Self {
        Patch {
            op: PatchOp::Merge,
            path,
            old_value,
            new_value: Some(fragment),
        }
    }

    /// Check if two patches touch related paths
    pub fn overlaps(&self, other: &Patch) -> bool {
        self.path.is_related_to(&other.path)
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.new_value {
            Some(value) => write!(f, "{} {} = {}", self.op, self.path, value),
            None => write!(f, "{} {}", self.op, self.path),
        }
    }
}

/// A batch of patches delivered as one notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Patches in application order (never empty)
    pub patches: Vec<Patch>,
    /// Set when the change was produced by a transaction
    pub transaction_id: Option<Uuid>,
    /// Wall-clock time the change was committed
    pub timestamp: DateTime<Utc>,
    /// Position of this change in its store's change stream
    pub sequence: u64,
}

impl Change {
    /// Create a change stamped with the current time
    pub fn new(patches: Vec<Patch>, transaction_id: Option<Uuid>, sequence: u64) -> Self {
        Change {
            patches,
            transaction_id,
            timestamp: Utc::now(),
            sequence,
        }
    }

    /// Distinct patch paths, in first-seen order
    pub fn affected_paths(&self) -> Vec<&KeyPath> {
        let mut paths: Vec<&KeyPath> = Vec::with_capacity(self.patches.len());
        for patch in &self.patches {
            if !paths.contains(&&patch.path) {
                paths.push(&patch.path);
            }
        }
        paths
    }

    /// True if any patch path is related to `path`
    pub fn affects(&self, path: &KeyPath) -> bool {
        self.patches.iter().any(|p| p.path.is_related_to(path))
    }

    /// True if the change came from a transaction
    pub fn is_transaction(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Number of patches
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Always false for changes emitted by a store
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> KeyPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_patch_constructors() {
        let set = Patch::set(p("a"), None, Value::Int(1));
        assert_eq!(set.op, PatchOp::Set);
        assert_eq!(set.new_value, Some(Value::Int(1)));

        let remove = Patch::remove(p("a"), Some(Value::Int(1)));
        assert_eq!(remove.op, PatchOp::Remove);
        assert_eq!(remove.new_value, None);

        let merge = Patch::merge(p("o"), None, Value::object());
        assert_eq!(merge.op, PatchOp::Merge);
    }

    #[test]
    fn test_patch_display() {
        let set = Patch::set(p("user.name"), None, Value::from("Bob"));
        assert_eq!(set.to_string(), r#"SET user.name = "Bob""#);
        let remove = Patch::remove(p("items[0]"), None);
        assert_eq!(remove.to_string(), "REMOVE items[0]");
    }

    #[test]
    fn test_patch_overlap() {
        let parent = Patch::set(p("user"), None, Value::object());
        let child = Patch::set(p("user.name"), None, Value::from("x"));
        let sibling = Patch::set(p("user.email"), None, Value::from("y"));
        assert!(parent.overlaps(&child));
        assert!(!child.overlaps(&sibling));
    }

    #[test]
    fn test_change_affected_paths_dedup() {
        let change = Change::new(
            vec![
                Patch::set(p("a"), None, Value::Int(1)),
                Patch::set(p("b"), None, Value::Int(1)),
                Patch::set(p("a"), Some(Value::Int(1)), Value::Int(2)),
            ],
            Some(Uuid::new_v4()),
            7,
        );
        assert_eq!(change.affected_paths(), vec![&p("a"), &p("b")]);
        assert!(change.is_transaction());
        assert_eq!(change.len(), 3);
        assert_eq!(change.sequence, 7);
    }

    #[test]
    fn test_change_affects_related_paths() {
        let change = Change::new(vec![Patch::set(p("user.name"), None, Value::from("A"))], None, 1);
        assert!(change.affects(&p("user")));
        assert!(change.affects(&p("user.name")));
        assert!(change.affects(&p("user.name.first")));
        assert!(change.affects(&KeyPath::root()));
        assert!(!change.affects(&p("user.age")));
        assert!(!change.is_transaction());
    }

    #[test]
    fn test_change_serializes() {
        let change = Change::new(vec![Patch::remove(p("a[1]"), Some(Value::Int(3)))], None, 2);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["patches"][0]["op"], "remove");
        assert_eq!(json["patches"][0]["path"], "a[1]");
        let back: Change = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }
}

//! Core types for bindstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Recursive tagged value tree (JSON plus color/url leaves)
//! - KeyPath: Parsed path into a value tree (`cart.items[0].price`)
//! - navigator: Pure get/set/merge/remove over a value tree
//! - Patch / Change: Mutation records and notification batches
//! - Contract types: Scope, StorageDescriptor, SemanticVersion
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod keypath;
pub mod navigator;
pub mod patch;
pub mod value;

// Re-export commonly used types
pub use contract::{
    Scope, SemanticVersion, SemanticVersionError, StorageDescriptor,
};
pub use error::{StoreError, StoreResult};
pub use keypath::{
    are_related, is_prefix, KeyPath, KeyPathError, PathComponent, MAX_ARRAY_INDEX,
    MAX_PATH_LENGTH,
};
pub use patch::{Change, Patch, PatchOp};
pub use value::{Map, Value, COLOR_TAG, MAX_NESTING_DEPTH, OBJECT_TAG, URL_TAG};

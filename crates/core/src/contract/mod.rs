//! Identity and lifecycle types
//!
//! These types decide which store a caller gets and when its data is
//! thrown away:
//!
//! - `scope`: app-wide vs. per-scenario partition
//! - `storage_descriptor`: persistence strategy
//! - `semver`: version triple driving version-gated resets

pub mod scope;
pub mod semver;
pub mod storage_descriptor;

// Re-exports
pub use scope::Scope;
pub use semver::{SemanticVersion, SemanticVersionError};
pub use storage_descriptor::StorageDescriptor;

//! Error types for bindstore
//!
//! This module defines the error hierarchy shared by every crate in the
//! workspace. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! ## Error kinds
//!
//! | Kind | Raised by | Meaning |
//! |------|-----------|---------|
//! | `InvalidValue` | path parsing, root replacement | malformed caller input |
//! | `DecodeFailure` | typed reads | stored value does not fit the requested type |
//! | `BackendUnavailable` | storage backends | persistence I/O failed |
//! | `NestedTransaction` | store entry points | re-entrant call from a transaction body |
//! | `Closed` | persistence worker | store was evicted and shut down |
//! | `Config` | `bindstore.toml` loading | unreadable or malformed configuration |
//!
//! A missing path is never an error: reads return `Ok(None)`.

use crate::keypath::KeyPathError;
use thiserror::Error;

/// Result type alias for bindstore operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types for bindstore
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Malformed input (unparseable key path, non-object root, ...)
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A stored value could not be converted into the requested type
    #[error("decode failure at '{path}': {reason}")]
    DecodeFailure {
        /// Canonical path of the value that failed to decode
        path: String,
        /// Underlying decoder message
        reason: String,
    },

    /// Persistence backend I/O failure
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A store method was called from inside one of its own transaction bodies
    #[error("nested transaction: store is already inside a transaction on this thread")]
    NestedTransaction,

    /// The store (or its persistence worker) has been shut down
    #[error("store closed: {0}")]
    Closed(String),

    /// Configuration could not be read, parsed or written
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create an `InvalidValue` error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        StoreError::InvalidValue(msg.into())
    }

    /// Create a `DecodeFailure` error
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::DecodeFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a `BackendUnavailable` error
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::BackendUnavailable(msg.into())
    }

    /// Create a `Closed` error
    pub fn closed(msg: impl Into<String>) -> Self {
        StoreError::Closed(msg.into())
    }

    /// Create a `Config` error
    pub fn config(msg: impl Into<String>) -> Self {
        StoreError::Config(msg.into())
    }

    /// Check if this is an `InvalidValue` error
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, StoreError::InvalidValue(_))
    }

    /// Check if this is a `DecodeFailure` error
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, StoreError::DecodeFailure { .. })
    }

    /// Check if this is a `BackendUnavailable` error
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable(_))
    }

    /// Check if this is a `Closed` error
    pub fn is_closed(&self) -> bool {
        matches!(self, StoreError::Closed(_))
    }
}

impl From<KeyPathError> for StoreError {
    fn from(e: KeyPathError) -> Self {
        StoreError::InvalidValue(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::BackendUnavailable(e.to_string())
    }
}

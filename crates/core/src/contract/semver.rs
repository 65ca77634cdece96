//! Semantic versions
//!
//! Versions order lexicographically by `(major, minor, patch)`. Only a
//! major difference is significant for store lifecycles: it triggers a
//! scope-wide reset.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing a semantic version
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticVersionError {
    /// Not exactly three dot-separated parts
    #[error("expected MAJOR.MINOR.PATCH, got '{0}'")]
    Format(String),
    /// A part is not an unsigned integer
    #[error("invalid version component '{0}'")]
    Component(String),
}

/// `(major, minor, patch)` version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SemanticVersion {
    /// Incompatible changes
    pub major: u64,
    /// Compatible additions
    pub minor: u64,
    /// Fixes
    pub patch: u64,
}

impl SemanticVersion {
    /// Create a version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
        }
    }

    /// True when the major components differ
    pub fn is_major_change(&self, other: &SemanticVersion) -> bool {
        self.major != other.major
    }
}

impl FromStr for SemanticVersion {
    type Err = SemanticVersionError;

    /// Parse `MAJOR.MINOR.PATCH`, with an optional leading `v`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parts: Vec<&str> = body.split('.').collect();
        if parts.len() != 3 {
            return Err(SemanticVersionError::Format(s.to_string()));
        }
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| SemanticVersionError::Component(part.to_string()))
        };
        Ok(SemanticVersion {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

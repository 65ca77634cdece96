//! Store scopes
//!
//! A [`Scope`] partitions both the factory registry and every backend's
//! namespace: the same storage descriptor used under two scopes yields two
//! independent stores with independent persisted data.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

const SCENARIO_PREFIX: &str = "scenario.";

/// Identity partition for a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Application-wide state
    App,
    /// State private to one scenario
    Scenario(String),
}

impl Scope {
    /// Scope for a scenario id
    pub fn scenario(id: impl Into<String>) -> Self {
        Scope::Scenario(id.into())
    }

    /// Check if this is the app scope
    pub fn is_app(&self) -> bool {
        matches!(self, Scope::App)
    }

    /// Namespace used by backends for this scope.
    ///
    /// Safe to use as a file stem, and distinct for distinct scopes even on
    /// case-insensitive file systems: in a scenario id, lowercase ASCII
    /// letters, digits and `-` are kept and every other byte becomes `_XX`
    /// (uppercase hex).
    pub fn namespace(&self) -> String {
        match self {
            Scope::App => "app".to_string(),
            Scope::Scenario(id) => {
                let mut stem = String::with_capacity(SCENARIO_PREFIX.len() + id.len());
                stem.push_str(SCENARIO_PREFIX);
                for byte in id.bytes() {
                    if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
                        stem.push(char::from(byte));
                    } else {
                        let _ = write!(stem, "_{:02X}", byte);
                    }
                }
                stem
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::App => write!(f, "app"),
            Scope::Scenario(id) => write!(f, "scenario:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace() {
        assert_eq!(Scope::App.namespace(), "app");
        assert_eq!(Scope::scenario("checkout-1").namespace(), "scenario.checkout-1");
        assert_eq!(Scope::scenario("a/b c").namespace(), "scenario.a_2Fb_20c");
        assert_eq!(Scope::scenario("Team").namespace(), "scenario._54eam");
        assert_eq!(Scope::scenario("é").namespace(), "scenario._C3_A9");
    }

    #[test]
    fn test_namespace_is_injective() {
        let ids = ["a/b", "a_b", "a_2Fb", "A", "a", "", "_", "a b", "a.b"];
        let stems: std::collections::HashSet<String> = ids
            .iter()
            .map(|id| Scope::scenario(*id).namespace().to_ascii_lowercase())
            .collect();
        assert_eq!(stems.len(), ids.len());
        assert!(!stems.contains(&Scope::App.namespace()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::App.to_string(), "app");
        assert_eq!(Scope::scenario("x").to_string(), "scenario:x");
    }

    #[test]
    fn test_scopes_distinct() {
        assert_ne!(Scope::App, Scope::scenario("app"));
        assert_ne!(Scope::scenario("a"), Scope::scenario("b"));
        assert!(Scope::App.is_app());
    }
}

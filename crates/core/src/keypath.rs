//! Key paths into a value tree
//!
//! A [`KeyPath`] addresses a location inside a store's root object using a
//! sequence of property and index components.
//!
//! # Path Syntax
//!
//! ```text
//! path    := "" | segment ( "." segment | "[" digits "]" )*
//! segment := one or more characters other than '.', '[' and ']'
//! ```
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `name` | Object property | `user` |
//! | `.name` | Nested property | `user.name` |
//! | `[n]` | Array index | `items[0]` |
//! | (empty) | Root | `` |
//!
//! Parsing is greedy left to right. Malformed input is rejected with a
//! [`KeyPathError`] rather than being partially interpreted.
//!
//! # Limits
//!
//! | Limit | Value | Constant |
//! |-------|-------|----------|
//! | Max path length | 256 components | [`MAX_PATH_LENGTH`] |
//! | Max array index | 1M | [`MAX_ARRAY_INDEX`] |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of components in a key path
pub const MAX_PATH_LENGTH: usize = 256;

/// Largest array index a key path may address.
///
/// Setting an index auto-extends the array with nulls, so this bounds the
/// number of placeholders a single write can allocate.
pub const MAX_ARRAY_INDEX: usize = 1_000_000;

/// Error type for key path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyPathError {
    /// Empty property name in path
    #[error("empty segment in path at position {0}")]
    EmptySegment(usize),
    /// Bracket opened but never closed
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Bracket contents are not an unsigned integer
    #[error("invalid array index at position {0}: '{1}'")]
    InvalidIndex(usize, String),
    /// Path starts with an index instead of a property
    #[error("path must start with a property name, found index at position {0}")]
    LeadingIndex(usize),
    /// Character not allowed at this position
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Too many components
    #[error("path length {0} exceeds maximum of {max} components", max = MAX_PATH_LENGTH)]
    TooLong(usize),
    /// Index above [`MAX_ARRAY_INDEX`]
    #[error("array index {0} exceeds maximum of {max}", max = MAX_ARRAY_INDEX)]
    IndexTooLarge(usize),
}

/// One step of a key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathComponent {
    /// Object property: `.name`
    Property(String),
    /// Array index: `[n]`
    Index(usize),
}

impl PathComponent {
    /// Check if this is a property component
    pub fn is_property(&self) -> bool {
        matches!(self, PathComponent::Property(_))
    }

    /// Check if this is an index component
    pub fn is_index(&self) -> bool {
        matches!(self, PathComponent::Index(_))
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Property(name) => write!(f, ".{}", name),
            PathComponent::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A parsed path into a value tree
///
/// # Examples
///
/// ```
/// use bindstore_core::KeyPath;
///
/// let price: KeyPath = "cart.items[0].price".parse().unwrap();
/// let built = KeyPath::root().key("cart").key("items").index(0).key("price");
/// assert_eq!(price, built);
/// assert_eq!(price.to_string(), "cart.items[0].price");
///
/// let cart: KeyPath = "cart".parse().unwrap();
/// assert!(cart.is_prefix_of(&price));
/// assert!(price.is_related_to(&cart));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyPath {
    components: Vec<PathComponent>,
}

impl KeyPath {
    /// The root path (no components)
    pub fn root() -> Self {
        KeyPath {
            components: Vec::new(),
        }
    }

    /// Parse a path, returning a [`KeyPathError`] on malformed input
    pub fn parse(text: &str) -> Result<Self, KeyPathError> {
        text.parse()
    }

    /// Build a path from components
    pub fn from_components(components: Vec<PathComponent>) -> Self {
        KeyPath { components }
    }

    /// The path components, outermost first
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the root path
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// True for the root path
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Append a property component (builder pattern)
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.components.push(PathComponent::Property(name.into()));
        self
    }

    /// Append an index component (builder pattern)
    pub fn index(mut self, idx: usize) -> Self {
        self.components.push(PathComponent::Index(idx));
        self
    }

    /// Parent path (`None` for the root)
    pub fn parent(&self) -> Option<KeyPath> {
        if self.components.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.components.pop();
        Some(parent)
    }

    /// Last component (`None` for the root)
    pub fn last(&self) -> Option<&PathComponent> {
        self.components.last()
    }

    /// True if `self` is a prefix of (or equal to) `other`.
    ///
    /// The root is a prefix of every path.
    pub fn is_prefix_of(&self, other: &KeyPath) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// True if either path is a prefix of the other.
    ///
    /// A write at one path can change what a reader at a related path sees.
    pub fn is_related_to(&self, other: &KeyPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Canonical text form (inverse of [`KeyPath::parse`])
    pub fn to_path_string(&self) -> String {
        let mut out = String::new();
        for component in &self.components {
            match component {
                PathComponent::Property(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathComponent::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

/// Free-function form of [`KeyPath::is_prefix_of`]
pub fn is_prefix(a: &KeyPath, b: &KeyPath) -> bool {
    a.is_prefix_of(b)
}

/// Free-function form of [`KeyPath::is_related_to`]
pub fn are_related(a: &KeyPath, b: &KeyPath) -> bool {
    a.is_related_to(b)
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(KeyPath::root());
        }

        let chars: Vec<char> = s.chars().collect();
        let mut components = Vec::new();

        if chars[0] == '[' {
            return Err(KeyPathError::LeadingIndex(0));
        }

        // Leading bare property name
        let mut i = read_property(&chars, 0, &mut components)?;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i = read_property(&chars, i + 1, &mut components)?;
                }
                '[' => {
                    let start = i;
                    i += 1;
                    let digits_start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(KeyPathError::UnclosedBracket(start));
                    }
                    let digits: String = chars[digits_start..i].iter().collect();
                    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                        return Err(KeyPathError::InvalidIndex(digits_start, digits));
                    }
                    let idx = digits
                        .parse::<usize>()
                        .map_err(|_| KeyPathError::InvalidIndex(digits_start, digits.clone()))?;
                    if idx > MAX_ARRAY_INDEX {
                        return Err(KeyPathError::IndexTooLarge(idx));
                    }
                    components.push(PathComponent::Index(idx));
                    i += 1; // closing bracket
                }
                other => return Err(KeyPathError::UnexpectedChar(other, i)),
            }
        }

        if components.len() > MAX_PATH_LENGTH {
            return Err(KeyPathError::TooLong(components.len()));
        }
        Ok(KeyPath { components })
    }
}

/// Read a property name starting at `start`; returns the index after it
fn read_property(
    chars: &[char],
    start: usize,
    components: &mut Vec<PathComponent>,
) -> Result<usize, KeyPathError> {
    let mut i = start;
    while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
        i += 1;
    }
    if i == start {
        if i < chars.len() && chars[i] == ']' {
            return Err(KeyPathError::UnexpectedChar(']', i));
        }
        return Err(KeyPathError::EmptySegment(start));
    }
    components.push(PathComponent::Property(chars[start..i].iter().collect()));
    Ok(i)
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_path_string())
    }
}

impl<'de> Deserialize<'de> for KeyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

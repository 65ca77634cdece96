//! Value types for bindstore
//!
//! This module defines [`Value`], the recursive tagged tree every store holds.
//!
//! ## Canonical Value Model
//!
//! The Value enum has exactly 9 variants:
//! - Null, Bool, Int, Float, String, Color, Url, Array, Object
//!
//! `Color` and `Url` are semantic leaf kinds: they carry a string, but UI
//! bindings treat them differently from plain text.
//!
//! ### Type rules
//!
//! - `Int(1) != Float(1.0)`: different variants are never equal
//! - `Color("#ffffff") != String("#ffffff")`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Object keys are unique and ordered (`BTreeMap`), equality is structural
//!
//! ## Wire format
//!
//! Values encode to plain JSON with two additions:
//!
//! | Variant | JSON |
//! |---------|------|
//! | `Color(c)` | `{"$color": c}` |
//! | `Url(u)` | `{"$url": u}` |
//! | `Object` whose only key is `$color`, `$url` or `$object` | `{"$object": {...}}` |
//!
//! The `$object` wrapper keeps the encoding injective: an ordinary object
//! that happens to look like a discriminant decodes back to an object.
//!
//! Decoding dispatches on the JSON token: `null`, string, integer, float,
//! bool, array, object. A number token that fits `i64` becomes `Int`; any
//! other number (fraction, exponent, or outside `i64`) becomes `Float`.
//! Plain strings are never reclassified; see [`Value::detect`] for the
//! opt-in heuristic.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// Wire discriminant key for [`Value::Color`]
pub const COLOR_TAG: &str = "$color";

/// Wire discriminant key for [`Value::Url`]
pub const URL_TAG: &str = "$url";

/// Wire escape for objects that would otherwise read as a discriminant
pub const OBJECT_TAG: &str = "$object";

/// Maximum nesting depth accepted by [`Value::validate_depth`]
pub const MAX_NESTING_DEPTH: usize = 100;

static NULL: Value = Value::Null;

/// Object representation used by [`Value::Object`]
pub type Map = BTreeMap<String, Value>;

/// Canonical value tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Color literal, e.g. `#ff8800`
    Color(String),
    /// URL literal, e.g. `https://example.com/logo.png`
    Url(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object with unique string keys
    Object(Map),
}

impl Value {
    /// Create an empty object
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    /// Create an empty array
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Classify a string using the legacy color/url heuristic.
    ///
    /// - `#` followed by 6 or 8 hex digits becomes [`Value::Color`]
    /// - an `http://` or `https://` prefix becomes [`Value::Url`]
    /// - anything else stays a plain [`Value::String`]
    ///
    /// The heuristic is lossy, which is why decoding never applies it.
    pub fn detect(text: impl Into<String>) -> Self {
        let text = text.into();
        if is_hex_color(&text) {
            Value::Color(text)
        } else if text.starts_with("http://") || text.starts_with("https://") {
            Value::Url(text)
        } else {
            Value::String(text)
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Color(_) => "color",
            Value::Url(_) => "url",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is an array value
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the text of a String, Color or Url value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Color(s) | Value::Url(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a slice if this is an Array value
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as a map if this is an Object value
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable access to an Object value
    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up an object member; `None` for missing keys and non-objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Maximum container nesting depth (0 for scalars)
    pub fn nesting_depth(&self) -> usize {
        match self {
            Value::Array(a) => 1 + a.iter().map(Value::nesting_depth).max().unwrap_or(0),
            Value::Object(o) => 1 + o.values().map(Value::nesting_depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Reject values nested deeper than [`MAX_NESTING_DEPTH`]
    pub fn validate_depth(&self) -> crate::StoreResult<()> {
        let depth = self.nesting_depth();
        if depth > MAX_NESTING_DEPTH {
            return Err(crate::StoreError::invalid_value(format!(
                "nesting depth {} exceeds maximum of {}",
                depth, MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    /// Serialize to compact JSON text
    pub fn to_json_string(&self) -> String {
        serde_json::Value::from(self.clone()).to_string()
    }

    /// JSON view with `Color` and `Url` leaves as plain strings
    ///
    /// Lossy: decoding the result yields `String` for those leaves. Objects
    /// are not escaped.
    pub fn to_plain_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) | Value::Color(s) | Value::Url(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Array(a) => serde_json::Value::Array(a.iter().map(Value::to_plain_json).collect()),
            Value::Object(o) => serde_json::Value::Object(
                o.iter().map(|(k, v)| (k.clone(), v.to_plain_json())).collect(),
            ),
        }
    }

    /// Convert from a `serde_json::Value`, honouring the color/url discriminant
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(mut obj) => match obj.remove(OBJECT_TAG) {
                Some(serde_json::Value::Object(escaped)) if obj.is_empty() => {
                    Value::Object(decode_entries(escaped))
                }
                Some(other) => {
                    obj.insert(OBJECT_TAG.to_string(), other);
                    untag(decode_entries(obj))
                }
                None => untag(decode_entries(obj)),
            },
        }
    }
}

fn decode_entries(obj: serde_json::Map<String, serde_json::Value>) -> Map {
    obj.into_iter()
        .map(|(k, v)| (k, Value::from_json(v)))
        .collect()
}

/// True for a single-key object whose key is reserved on the wire
fn needs_escape(map: &Map) -> bool {
    map.len() == 1
        && map
            .keys()
            .all(|k| k == COLOR_TAG || k == URL_TAG || k == OBJECT_TAG)
}

fn is_hex_color(text: &str) -> bool {
    match text.strip_prefix('#') {
        Some(hex) => (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Collapse a single-key discriminant object into its semantic leaf
fn untag(mut map: Map) -> Value {
    if map.len() == 1 {
        let tagged = match map.iter().next() {
            Some((k, Value::String(_))) if k == COLOR_TAG || k == URL_TAG => Some(k.clone()),
            _ => None,
        };
        if let Some(tag) = tagged {
            if let Some(Value::String(s)) = map.remove(&tag) {
                return if tag == COLOR_TAG {
                    Value::Color(s)
                } else {
                    Value::Url(s)
                };
            }
        }
    }
    Value::Object(map)
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Color(s) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(COLOR_TAG, s)?;
                map.end()
            }
            Value::Url(s) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(URL_TAG, s)?;
                map.end()
            }
            Value::Array(a) => a.serialize(serializer),
            Value::Object(o) if needs_escape(o) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(OBJECT_TAG, o)?;
                map.end()
            }
            Value::Object(o) => o.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    /// Decodes through `serde_json::Value` so discriminants are resolved
    /// with the whole object in view.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

impl FromStr for Value {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_string())
    }
}

// =============================================================================
// Indexing
// =============================================================================

impl Index<&str> for Value {
    type Output = Value;

    /// Missing keys and non-objects index to `Null`
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Out-of-range indices and non-arrays index to `Null`
    fn index(&self, idx: usize) -> &Value {
        self.as_array().and_then(|a| a.get(idx)).unwrap_or(&NULL)
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Color(s) => tagged_json(COLOR_TAG, s),
            Value::Url(s) => tagged_json(URL_TAG, s),
            Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                let escape = needs_escape(&o);
                let obj = serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect());
                if escape {
                    let mut wrapper = serde_json::Map::new();
                    wrapper.insert(OBJECT_TAG.to_string(), obj);
                    serde_json::Value::Object(wrapper)
                } else {
                    obj
                }
            }
        }
    }
}

fn tagged_json(tag: &str, text: String) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert(tag.to_string(), serde_json::Value::String(text));
    serde_json::Value::Object(obj)
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

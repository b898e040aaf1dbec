//! Opaque, type-specific node properties.
//!
//! A node's props are a small ordered map of scalar, list, and nested-map
//! values. The model treats them as opaque; node codecs give the keys
//! meaning. The one invariant enforced here is that every numeric field,
//! however deeply nested, holds a finite number -- a NaN cannot be written
//! into an attribute value, so it is rejected eagerly with the path to the
//! offending field.

use super::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    /// Get the string value, if this is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer value, if this is an integer.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the boolean value, if this is a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the nested map, if this is a map.
    #[inline]
    pub fn as_map(&self) -> Option<&BTreeMap<String, PropValue>> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, path: &str) -> Result<()> {
        match self {
            PropValue::Float(f) if !f.is_finite() => Err(ModelError::InvalidParameter {
                path: path.to_string(),
                reason: format!("{f} is not a finite number"),
            }),
            PropValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.validate(&format!("{path}[{i}]"))?;
                }
                Ok(())
            },
            PropValue::Map(map) => {
                for (key, value) in map {
                    value.validate(&format!("{path}.{key}"))?;
                }
                Ok(())
            },
            _ => Ok(()),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        PropValue::Int(i)
    }
}

impl From<f64> for PropValue {
    fn from(f: f64) -> Self {
        PropValue::Float(f)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

/// An ordered property bag attached to a node instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropBag(BTreeMap<String, PropValue>);

impl PropBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get a value by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    /// Get a string value by key.
    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    /// Get an integer value by key.
    #[inline]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropValue::as_int)
    }

    /// Get a boolean value by key, defaulting to false when absent.
    #[inline]
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key).and_then(PropValue::as_bool).unwrap_or(false)
    }

    /// Insert a value, replacing any existing one under the same key.
    pub fn insert<K: Into<String>, V: Into<PropValue>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with<K: Into<String>, V: Into<PropValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.0.iter()
    }

    /// Check every numeric field in the bag, however nested, for finiteness.
    ///
    /// Fails with the dotted/indexed path of the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.0 {
            value.validate(key)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, PropValue)> for PropBag {
    fn from_iter<T: IntoIterator<Item = (String, PropValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

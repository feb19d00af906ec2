//! Pipe results - the key/value containers passed between pipes

use crate::core::value::{Handle, Value, ValueKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Inputs consumed and outputs produced by a pipe.
///
/// Keys iterate in lexicographic order so that logs and tests are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PipeResult {
    params: BTreeMap<String, Value>,
}

impl PipeResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result by merging `results` in order; later values win on key collision
    pub fn merged<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a PipeResult>,
    {
        let mut out = Self::new();
        for result in results {
            out.merge(result);
        }
        out
    }

    /// Insert or overwrite a param
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn get_map(&self, key: &str) -> Option<&BTreeMap<String, Value>> {
        self.get(key).and_then(Value::as_map)
    }

    pub fn get_handle(&self, key: &str) -> Option<&Handle> {
        self.get(key).and_then(Value::as_handle)
    }

    /// Whether the key is present, even if its value is [`Value::Null`]
    pub fn exists(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Runtime kind of the stored value, `None` if the key is missing
    pub fn type_of(&self, key: &str) -> Option<ValueKind> {
        self.get(key).map(Value::kind)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.params.remove(key)
    }

    /// Copy every param of `other` into this result, overwriting duplicates.
    ///
    /// Merging a result into itself cannot be expressed (`other` is borrowed
    /// shared while `self` is exclusive), so that case is trivially a no-op.
    pub fn merge(&mut self, other: &PipeResult) {
        for (key, value) in &other.params {
            self.params.insert(key.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for PipeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys().collect();
        write!(f, "[{}]", keys.join(", "))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PipeResult {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.set(k, v);
        }
        out
    }
}

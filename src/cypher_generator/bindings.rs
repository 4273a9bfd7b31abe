//! Bound parameter map.
//!
//! Placeholder names derive deterministically from the source column name
//! (dots replaced by underscores) and are disambiguated with an appended
//! sequence number when the same column appears more than once in one
//! compiled statement, so the placeholder -> value mapping is bijective.

use serde_json::{Map, Value};

/// Ordered map of placeholder name -> bound value. Insertion order is
/// preserved (serde_json `preserve_order`), so compiling the same query
/// state twice yields an identical map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: Map<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under a name derived from `column`, returning the
    /// assigned placeholder name (without the `$` sigil).
    pub fn add(&mut self, column: &str, value: Value) -> String {
        let base = sanitize_param_name(column);
        let mut name = base.clone();
        let mut seq = 1u32;
        while self.map.contains_key(&name) {
            seq += 1;
            name = format!("{}_{}", base, seq);
        }
        self.map.insert(name.clone(), value);
        name
    }

    /// Insert under an exact caller-chosen name (raw predicate bindings).
    /// Overwrites an existing entry of the same name.
    pub fn insert_raw(&mut self, name: &str, value: Value) {
        self.map.insert(name.to_string(), value);
    }

    pub fn merge(&mut self, other: Bindings) {
        for (k, v) in other.map {
            self.map.insert(k, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(|k| k.as_str()).collect()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }
}

/// Result keys and placeholder names cannot contain dots
pub fn sanitize_param_name(column: &str) -> String {
    column.replace('.', "_")
}

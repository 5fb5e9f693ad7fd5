//! Ordered key/value rows returned by statements.
//!
//! A [`Record`] keeps keys and values in two parallel vectors. Keys are not
//! required to be unique; lookups return the first match.

use serde::Serialize;

use super::value::Value;
use crate::types::{GraphError, Result};

/// Key holding the identity of a graph entity.
pub const ID: &str = "@id";
/// Key holding the single label of a node.
pub const LABEL: &str = "@label";
/// Key holding all labels of a node.
pub const LABELS: &str = "@labels";
/// Key holding the type of a relationship.
pub const TYPE: &str = "@type";
/// Key holding the identity of a relationship's start node.
pub const START_ID: &str = "@startId";
/// Key holding the identity of a relationship's end node.
pub const END_ID: &str = "@endId";

/// A single result row.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Record {
    keys: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from `(key, value)` pairs, keeping their order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.add(key, value);
        }
        record
    }

    /// Appends a key/value pair. Duplicate keys are kept; the earlier one
    /// shadows later ones on lookup.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.keys.push(key.into());
        self.values.push(value.into());
    }

    /// Position of the first occurrence of `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Value of the first occurrence of `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.index_of(key).map(|idx| &self.values[idx])
    }

    /// Value at a column position.
    pub fn get_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Column names in order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Column values in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over `(key, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Takes the value of column `idx`, consuming the record.
    pub fn into_value_at(mut self, idx: usize) -> Result<Value> {
        if idx >= self.values.len() {
            return Err(GraphError::UnexpectedValue {
                path: format!("column {idx}"),
                expected: "value",
                found: "missing",
            });
        }
        Ok(self.values.swap_remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absent_key_is_none() {
        let mut rec = Record::new();
        assert_eq!(rec.index_of("missing"), None);
        rec.add("name", "Alice");
        assert_eq!(rec.index_of("missing"), None);
        assert!(rec.value("missing").is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let mut rec = Record::new();
        rec.add(ID, 1i64);
        rec.add(ID, 2i64);
        assert_eq!(rec.index_of(ID), Some(0));
        assert_eq!(rec.value(ID), Some(&Value::Int(1)));
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn into_value_at_out_of_range() {
        let rec = Record::from_pairs([("a", 1i64)]);
        assert!(rec.clone().into_value_at(3).is_err());
        assert_eq!(rec.into_value_at(0).unwrap(), Value::Int(1));
    }

    proptest! {
        #[test]
        fn prop_lookup_tracks_each_add(keys in prop::collection::hash_set("[a-z]{1,6}", 1..20)) {
            let mut rec = Record::new();
            for (i, key) in keys.iter().enumerate() {
                rec.add(key.clone(), i as i64);
                prop_assert_eq!(rec.index_of(key), Some(i));
                prop_assert_eq!(rec.value(key), Some(&Value::Int(i as i64)));
                prop_assert_eq!(rec.keys().len(), rec.values().len());
            }
        }
    }
}

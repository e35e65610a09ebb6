//! DISTINCT de-duplication across partitions and calls.

use std::collections::BTreeSet;

use serde_json::Value as JsonValue;

use super::canonical_json;

/// The set of rows already emitted, keyed by canonical JSON.
///
/// The set is carried in the continuation token so that later pages do not
/// repeat rows emitted by earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctSet {
    seen: BTreeSet<String>,
}

impl DistinctSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a set from its serialized keys.
    #[must_use]
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: keys.into_iter().collect(),
        }
    }

    /// Records `row`; returns false if an equal row was seen before.
    pub fn insert(&mut self, row: &JsonValue) -> bool {
        self.seen.insert(canonical_json(row))
    }

    /// Keeps the rows of `rows` not seen before, in order.
    pub fn filter(&mut self, rows: Vec<JsonValue>) -> Vec<JsonValue> {
        rows.into_iter().filter(|row| self.insert(row)).collect()
    }

    /// Number of distinct rows seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing was seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// The canonical keys, for serialization.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.seen.iter().cloned().collect()
    }
}

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::schema::field::{FieldKind, Value};

/// An insertion-ordered string-keyed collection.
///
/// The wire protocol addresses entries positionally during decode, so the
/// map keeps an auxiliary index→key table alongside the logical keyed
/// entries. The table is established by ADD operations and consulted by
/// later REPLACE/DELETE operations carrying only the positional index.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSchema {
    element: FieldKind,
    entries: IndexMap<String, Value>,
    index_to_key: HashMap<u64, String>,
}

impl MapSchema {
    pub fn new(element: FieldKind) -> Self {
        Self {
            element,
            entries: IndexMap::new(),
            index_to_key: HashMap::new(),
        }
    }

    pub fn element(&self) -> &FieldKind {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn key_by_index(&self, index: u64) -> Option<&String> {
        self.index_to_key.get(&index)
    }

    /// Establish (or update) the index→key mapping, then upsert the entry.
    /// Returns the previous value when the key already existed.
    pub fn set_by_index(&mut self, index: u64, key: String, value: Value) -> Option<Value> {
        self.index_to_key.insert(index, key.clone());
        self.entries.insert(key, value)
    }

    /// Update the entry addressed by an already-established positional index.
    pub fn replace_by_index(&mut self, index: u64, value: Value) -> Option<(String, Option<Value>)> {
        let key = self.index_to_key.get(&index)?.clone();
        let previous = self.entries.insert(key.clone(), value);
        Some((key, previous))
    }

    /// Remove both the index mapping and the keyed entry.
    pub fn delete_by_index(&mut self, index: u64) -> Option<(String, Value)> {
        let key = self.index_to_key.remove(&index)?;
        let value = self.entries.shift_remove(&key)?;
        Some((key, value))
    }

    /// Empty the collection, returning the removed entries in order.
    pub fn clear_entries(&mut self) -> Vec<(String, Value)> {
        self.index_to_key.clear();
        self.entries.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

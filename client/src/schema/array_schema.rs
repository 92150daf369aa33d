use crate::schema::field::{FieldKind, Value};

/// A 0-based, gap-tolerant, reindexable ordered collection.
///
/// DELETE operations tombstone a slot rather than removing it, because the
/// wire protocol batches several deletions whose positional indices all
/// refer to the pre-deletion layout. [`ArraySchema::on_decode_end`] runs
/// once per decode call, after every operation of that call, and compacts
/// the tombstones into a dense array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    element: FieldKind,
    items: Vec<Option<Value>>,
}

impl ArraySchema {
    pub fn new(element: FieldKind) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }

    pub fn element(&self) -> &FieldKind {
        &self.element
    }

    /// Slot count, tombstones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The live value at `index`; `None` for a tombstone or out-of-range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index).and_then(|slot| slot.as_ref())
    }

    fn pad_to(&mut self, index: usize) {
        while self.items.len() <= index {
            self.items.push(None);
        }
    }

    /// ADD at `index`. An ADD at index 0 while the array is non-empty is
    /// the wire encoding of an unshift and inserts at the front rather
    /// than overwriting. Gaps are padded with tombstones.
    pub fn add(&mut self, index: usize, value: Value) -> Option<Value> {
        if index == 0 && !self.items.is_empty() {
            self.items.insert(0, Some(value));
            return None;
        }
        self.pad_to(index);
        self.items[index].replace(value)
    }

    /// REPLACE the slot at `index`, returning the previous live value.
    pub fn replace(&mut self, index: usize, value: Value) -> Option<Value> {
        self.pad_to(index);
        self.items[index].replace(value)
    }

    /// Tombstone the slot at `index`, returning the previous live value.
    pub fn delete(&mut self, index: usize) -> Option<Value> {
        if index >= self.items.len() {
            return None;
        }
        self.items[index].take()
    }

    /// Remove the current front element, then insert `value` at `index`.
    /// This is the wire encoding of a server-side shift combined with a
    /// write. Returns the removed front value.
    pub fn delete_and_move(&mut self, index: usize, value: Value) -> Option<Value> {
        let removed = if self.items.is_empty() {
            None
        } else {
            self.items.remove(0)
        };
        while self.items.len() < index {
            self.items.push(None);
        }
        self.items.insert(index, Some(value));
        removed
    }

    /// Empty the collection, returning the live values with their slot
    /// indices at the time of removal.
    pub fn clear_entries(&mut self) -> Vec<(usize, Value)> {
        let mut removed = Vec::new();
        for (index, slot) in self.items.iter_mut().enumerate() {
            if let Some(value) = slot.take() {
                removed.push((index, value));
            }
        }
        self.items.clear();
        removed
    }

    /// End-of-decode compaction: drop tombstoned slots and shift later
    /// elements down. Compaction mid-call would corrupt still-pending
    /// positional references, so the decoder calls this exactly once per
    /// decode call.
    pub fn on_decode_end(&mut self) {
        self.items.retain(|slot| slot.is_some());
    }

    /// Live values, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }
}

//! Per-attribute index
//!
//! `BTreeMap<IndexKey, BTreeSet<Position>>` gives both the value -> positions
//! mapping and the sorted distinct-value ordering that range queries walk.
//! A reverse map remembers which keys each position was indexed under, so a
//! position can be unindexed even after its record was changed out-of-band.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use serde_json::Value;

use crate::query::CompareOp;
use crate::storage::{Position, Record, RecordStore};

use super::key::IndexKey;
use super::manager::Generation;

/// Index over one attribute.
#[derive(Debug)]
pub struct AttributeIndex {
    /// Attribute name
    attribute: String,
    /// Generation this index was last built under
    generation: Generation,
    /// Key -> positions, sorted by key
    tree: BTreeMap<IndexKey, BTreeSet<Position>>,
    /// Position -> keys it is indexed under
    by_position: HashMap<Position, Vec<IndexKey>>,
}

impl AttributeIndex {
    /// Creates an empty index
    pub fn new(attribute: impl Into<String>, generation: Generation) -> Self {
        Self {
            attribute: attribute.into(),
            generation,
            tree: BTreeMap::new(),
            by_position: HashMap::new(),
        }
    }

    /// Attribute name
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Generation this index was last built under
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Discards all entries and re-indexes every live record.
    ///
    /// Records lacking the attribute contribute nothing, so "absent" stays
    /// distinguishable from any stored value.
    pub fn rebuild(&mut self, records: &RecordStore, generation: Generation) {
        self.tree.clear();
        self.by_position.clear();
        self.generation = generation;

        for (position, record) in records.iter() {
            if let Some(value) = record.get(&self.attribute) {
                self.insert_one(&value, position);
            }
        }
    }

    /// Indexes `value` for `position`.
    pub fn insert_one(&mut self, value: &Value, position: Position) {
        let keys = IndexKey::keys_for(value);
        for key in &keys {
            self.tree.entry(key.clone()).or_default().insert(position);
        }
        let indexed = self.by_position.entry(position).or_default();
        for key in keys {
            if !indexed.contains(&key) {
                indexed.push(key);
            }
        }
    }

    /// Removes the entries `value` produced for `position`.
    pub fn remove_one(&mut self, value: &Value, position: Position) {
        let keys = IndexKey::keys_for(value);
        for key in &keys {
            self.detach(key, position);
        }
        if let Some(indexed) = self.by_position.get_mut(&position) {
            indexed.retain(|k| !keys.contains(k));
            if indexed.is_empty() {
                self.by_position.remove(&position);
            }
        }
    }

    /// Removes every entry held for `position`, whatever its record now holds.
    pub fn remove_position(&mut self, position: Position) {
        if let Some(keys) = self.by_position.remove(&position) {
            for key in &keys {
                self.detach(key, position);
            }
        }
    }

    fn detach(&mut self, key: &IndexKey, position: Position) {
        if let Some(positions) = self.tree.get_mut(key) {
            positions.remove(&position);
            if positions.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Positions whose value equals `value`.
    ///
    /// A non-empty sequence matches records holding every one of its
    /// elements. An empty sequence matches records holding an empty sequence.
    pub fn lookup_eq(&self, value: &Value) -> BTreeSet<Position> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                let mut keys = items.iter().map(IndexKey::from_json);
                let Some(first) = keys.next() else {
                    return BTreeSet::new();
                };
                let mut result = self.lookup_key(&first);
                for key in keys {
                    if result.is_empty() {
                        break;
                    }
                    let next = self.lookup_key(&key);
                    result.retain(|p| next.contains(p));
                }
                result
            }
            _ => self.lookup_key(&IndexKey::from_json(value)),
        }
    }

    fn lookup_key(&self, key: &IndexKey) -> BTreeSet<Position> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Positions satisfying `op` against `value`.
    ///
    /// Ordered operators walk only keys of the bound's kind; values of any
    /// other kind are left out rather than compared. `Ne` is the complement
    /// of [`lookup_eq`](Self::lookup_eq) among positions holding the
    /// attribute. `Eq` is accepted and forwarded to `lookup_eq`.
    pub fn lookup_range(&self, op: CompareOp, value: &Value) -> BTreeSet<Position> {
        let bound = IndexKey::from_json(value);
        let kind = bound.kind();

        let walk: Box<dyn Iterator<Item = (&IndexKey, &BTreeSet<Position>)> + '_> = match op {
            CompareOp::Eq => return self.lookup_eq(value),
            CompareOp::Ne => {
                let equal = self.lookup_eq(value);
                return self
                    .by_position
                    .keys()
                    .copied()
                    .filter(|p| !equal.contains(p))
                    .collect();
            }
            CompareOp::Lt => Box::new(
                self.tree
                    .range((Bound::Unbounded, Bound::Excluded(&bound)))
                    .rev(),
            ),
            CompareOp::Le => Box::new(
                self.tree
                    .range((Bound::Unbounded, Bound::Included(&bound)))
                    .rev(),
            ),
            CompareOp::Gt => Box::new(self.tree.range((Bound::Excluded(&bound), Bound::Unbounded))),
            CompareOp::Ge => Box::new(self.tree.range((Bound::Included(&bound), Bound::Unbounded))),
        };

        walk.take_while(|(key, _)| key.kind() == kind)
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect()
    }

    /// Positions holding the attribute at all
    pub fn positions(&self) -> BTreeSet<Position> {
        self.by_position.keys().copied().collect()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Number of positions holding the attribute
    pub fn position_count(&self) -> usize {
        self.by_position.len()
    }
}

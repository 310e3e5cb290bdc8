//! Index Manager for attrdb
//!
//! Owns one [`AttributeIndex`] per tracked attribute and the store's
//! generation counter.
//!
//! # API
//!
//! - `reindex(records, None)` - Rebuild every index, advance the generation
//! - `reindex(records, Some(names))` - Rebuild the named indexes only
//! - `declare_attribute(...)` - Backfill defaults and build a new index
//! - `on_insert` / `on_remove` / `on_update` - Incremental maintenance
//!
//! Mutations routed through the store keep every index current. Changes made
//! behind the store's back (through a shared record handle or `get_mut`) stay
//! invisible until a reindex; the generation counter exists so that queries
//! built before a full reindex are rejected afterwards.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::executor::IndexLookup;
use crate::observability::Event;
use crate::storage::{Position, Record, RecordStore};

use super::attribute::AttributeIndex;
use super::policy::{AttributePolicy, DefaultValue};

/// Monotonic counter advanced by every full reindex.
pub type Generation = u64;

/// Set of attribute indexes plus the generation counter.
#[derive(Debug, Default)]
pub struct IndexManager {
    /// Attribute name -> index
    indices: BTreeMap<String, AttributeIndex>,
    /// Current generation
    generation: Generation,
}

impl IndexManager {
    /// Creates a manager with no indexes at generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Names of tracked attributes, sorted
    pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.indices.keys().map(String::as_str)
    }

    /// Returns true if `name` is tracked
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Index for `name`
    pub fn get(&self, name: &str) -> Option<&AttributeIndex> {
        self.indices.get(name)
    }

    /// Rebuilds indexes from the live records.
    ///
    /// With no subset every index is rebuilt and the generation advances,
    /// invalidating all outstanding queries. With a subset only those
    /// indexes are rebuilt and the generation is left alone.
    pub fn reindex(
        &mut self,
        records: &RecordStore,
        subset: Option<&[&str]>,
        policy: &AttributePolicy,
    ) -> StoreResult<()> {
        match subset {
            None => {
                self.generation += 1;
                let generation = self.generation;
                for index in self.indices.values_mut() {
                    index.rebuild(records, generation);
                }
                info!(
                    target: "attrdb::index",
                    event = %Event::ReindexComplete,
                    generation,
                    attributes = self.indices.len(),
                    records = records.count(),
                );
            }
            Some(names) => {
                for name in names {
                    policy.check_explicit(name)?;
                    if !self.indices.contains_key(*name) {
                        return Err(StoreError::unknown_attribute(*name));
                    }
                }
                let generation = self.generation;
                for name in names {
                    if let Some(index) = self.indices.get_mut(*name) {
                        index.rebuild(records, generation);
                    }
                }
                debug!(
                    target: "attrdb::index",
                    event = %Event::PartialReindex,
                    generation,
                    attributes = ?names,
                );
            }
        }
        Ok(())
    }

    /// Starts tracking `name`.
    ///
    /// Records already holding the attribute are left untouched; every other
    /// live record receives `default`, in ascending position order. Without a
    /// default the declaration only succeeds if no live record lacks the
    /// attribute. Returns the number of records backfilled. The generation is
    /// not advanced.
    pub fn declare_attribute(
        &mut self,
        name: &str,
        default: Option<&mut DefaultValue>,
        records: &mut RecordStore,
        policy: &mut AttributePolicy,
    ) -> StoreResult<usize> {
        policy.check_explicit(name)?;

        let missing: Vec<Position> = records
            .iter()
            .filter(|(_, record)| !record.has(name))
            .map(|(position, _)| position)
            .collect();

        let backfilled = match (default, missing.first()) {
            (_, None) => 0,
            (None, Some(&position)) => {
                return Err(StoreError::MissingDefault {
                    attribute: name.to_string(),
                    position,
                });
            }
            (Some(default), Some(_)) => {
                for &position in &missing {
                    let record = records.get_mut(position)?;
                    record.set(name, default.produce());
                }
                missing.len()
            }
        };

        policy.admit(name);

        let generation = self.generation;
        self.indices
            .entry(name.to_string())
            .or_insert_with(|| AttributeIndex::new(name, generation))
            .rebuild(records, generation);

        debug!(
            target: "attrdb::index",
            event = %Event::AttributeDeclared,
            attribute = name,
            backfilled,
        );
        Ok(backfilled)
    }

    /// Indexes a freshly inserted record under every tracked attribute.
    pub fn on_insert(&mut self, position: Position, record: &dyn Record) {
        for index in self.indices.values_mut() {
            if let Some(value) = record.get(index.attribute()) {
                index.insert_one(&value, position);
            }
        }
    }

    /// Drops every entry for a removed position.
    pub fn on_remove(&mut self, position: Position) {
        for index in self.indices.values_mut() {
            index.remove_position(position);
        }
    }

    /// Re-indexes the named attributes of one record after an update.
    pub fn on_update(&mut self, position: Position, record: &dyn Record, names: &[String]) {
        for name in names {
            if let Some(index) = self.indices.get_mut(name) {
                index.remove_position(position);
                if let Some(value) = record.get(name) {
                    index.insert_one(&value, position);
                }
            }
        }
    }
}

impl IndexLookup for IndexManager {
    fn generation(&self) -> Generation {
        self.generation
    }

    fn index(&self, attribute: &str) -> Option<&AttributeIndex> {
        self.indices.get(attribute)
    }
}

//! Positional record store with tombstones
//!
//! Positions are assigned sequentially from zero and never recycled. A removed
//! record leaves its slot behind as a tombstone, so positions handed out
//! earlier keep pointing at the same logical record (or at nothing).

use crate::error::{StoreError, StoreResult};

use super::record::StoredRecord;

/// Stable, zero-based slot of a record within one store.
pub type Position = usize;

/// Ordered collection of records and their liveness.
#[derive(Debug, Default)]
pub struct RecordStore {
    /// `None` marks a tombstone
    slots: Vec<Option<StoredRecord>>,
    /// Number of live slots
    live: usize,
}

impl RecordStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its position.
    pub fn insert(&mut self, record: StoredRecord) -> Position {
        let position = self.slots.len();
        self.slots.push(Some(record));
        self.live += 1;
        position
    }

    /// Returns the live record at `position`.
    pub fn get(&self, position: Position) -> StoreResult<&StoredRecord> {
        self.slots
            .get(position)
            .and_then(Option::as_ref)
            .ok_or(StoreError::NotFound { position })
    }

    /// Mutable access to the live record at `position`.
    pub fn get_mut(&mut self, position: Position) -> StoreResult<&mut StoredRecord> {
        self.slots
            .get_mut(position)
            .and_then(Option::as_mut)
            .ok_or(StoreError::NotFound { position })
    }

    /// Tombstones `position` and hands back the record.
    pub fn remove(&mut self, position: Position) -> StoreResult<StoredRecord> {
        let record = self
            .slots
            .get_mut(position)
            .and_then(Option::take)
            .ok_or(StoreError::NotFound { position })?;
        self.live -= 1;
        Ok(record)
    }

    /// Returns true if `position` holds a live record
    pub fn is_live(&self, position: Position) -> bool {
        matches!(self.slots.get(position), Some(Some(_)))
    }

    /// Live positions in ascending order
    pub fn live_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.iter().map(|(position, _)| position)
    }

    /// Live records with their positions, ascending
    pub fn iter(&self) -> impl Iterator<Item = (Position, &StoredRecord)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.as_ref().map(|record| (position, record)))
    }

    /// Live records with their positions, ascending, mutable
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Position, &mut StoredRecord)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(position, slot)| slot.as_mut().map(|record| (position, record)))
    }

    /// Number of live records
    pub fn count(&self) -> usize {
        self.live
    }

    /// Position the next insert will receive
    pub fn next_position(&self) -> Position {
        self.slots.len()
    }
}

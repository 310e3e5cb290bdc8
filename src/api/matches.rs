//! Query result shapes

use serde_json::Value;

use crate::storage::StoredRecord;

/// Records returned by [`Store::query`](super::Store::query).
///
/// Which variant comes back depends on the store's
/// [`ReturnMode`](super::ReturnMode).
#[derive(Debug)]
pub enum Matches<'a> {
    One(&'a StoredRecord),
    /// Ascending by position
    Many(Vec<&'a StoredRecord>),
}

impl<'a> Matches<'a> {
    pub fn len(&self) -> usize {
        match self {
            Matches::One(_) => 1,
            Matches::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The record, if exactly one matched
    pub fn one(self) -> Option<&'a StoredRecord> {
        match self {
            Matches::One(record) => Some(record),
            Matches::Many(records) if records.len() == 1 => records.into_iter().next(),
            Matches::Many(_) => None,
        }
    }

    /// Every match, regardless of shape
    pub fn into_vec(self) -> Vec<&'a StoredRecord> {
        match self {
            Matches::One(record) => vec![record],
            Matches::Many(records) => records,
        }
    }

    /// JSON rendering: an object for `One`, an array for `Many`
    pub fn to_value(&self) -> Value {
        match self {
            Matches::One(record) => record.to_value(),
            Matches::Many(records) => {
                Value::Array(records.iter().map(|record| record.to_value()).collect())
            }
        }
    }
}

//! Record storage for attrdb
//!
//! Holds the records themselves, in insertion order, plus their liveness.
//! Indexes are derived from this state and never the other way around.
//!
//! # Invariants
//!
//! - Positions are assigned sequentially and never reused
//! - Removal tombstones a slot without compacting others
//! - Iteration yields live records only, ascending by position

mod record;
mod store;

pub use record::{Record, SharedRecord, StoredRecord};
pub use store::{Position, RecordStore};

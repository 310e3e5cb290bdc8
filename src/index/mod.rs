//! Index subsystem for attrdb
//!
//! Indexes are derived, in-memory state built from the record store.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the records, never the source of truth
//! - Deterministic: BTreeMap ordering for keys and positions
//! - Incremental: store mutations update indexes in place
//!
//! # Invariants
//!
//! - Tombstoned positions never appear in an index
//! - Records lacking an attribute have no entry for it
//! - Every index carries the generation it was built under

mod attribute;
mod key;
mod manager;
mod policy;

pub use attribute::AttributeIndex;
pub use key::{IndexKey, KeyKind};
pub use manager::{Generation, IndexManager};
pub use policy::{AttributePolicy, DefaultValue, FILTER_ATTRIBUTE, POSITION_ATTRIBUTE};

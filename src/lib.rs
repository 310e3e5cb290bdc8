//! attrdb - an embeddable in-memory record store with per-attribute indexes
//!
//! Equality and range queries resolve through per-attribute ordered indexes
//! instead of scanning every record. Queries are immutable trees built from
//! a generation-stamped [`Fields`] proxy and are rejected once a full reindex
//! has superseded their generation.

pub mod api;
pub mod cli;
pub mod error;
pub mod executor;
pub mod index;
pub mod observability;
pub mod query;
pub mod storage;

pub use api::{Matches, ReturnMode, Store, StoreBuilder, StoreConfig};
pub use error::{ConfigError, ErrorKind, StoreError, StoreResult};
pub use index::DefaultValue;
pub use query::{and, not, or, CompareOp, Fields, Query, Selector};
pub use storage::{Position, Record, SharedRecord, StoredRecord};

//! Public API for attrdb
//!
//! [`Store`] ties the record store, the index manager and the evaluator
//! together and is the only type most callers need.
//!
//! # Supported Operations
//!
//! - insert / insert_shared / insert_many
//! - declare_attribute
//! - query / query_list / query_one / query_positions / contains
//! - update
//! - remove / remove_at
//! - reindex

mod config;
mod matches;
mod store;

pub use config::{ReturnMode, StoreConfig};
pub use matches::Matches;
pub use store::{Store, StoreBuilder};

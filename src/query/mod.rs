//! Query expressions for attrdb
//!
//! Queries are immutable trees over attribute comparisons and arbitrary
//! predicates, combined with plain functions (`and`, `or`, `not`) or the
//! equivalent methods. No operator overloading.
//!
//! # Staleness
//!
//! Queries built from a [`Fields`] proxy remember the store generation they
//! were built under and are rejected once a full reindex has advanced it.

mod ast;
mod builder;
mod selector;

pub use ast::{and, not, or, CompareOp, Node, Predicate, Query, Stamp};
pub use builder::{Field, Fields};
pub use selector::Selector;

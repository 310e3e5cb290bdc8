//! Query evaluation for attrdb
//!
//! The evaluator turns a query tree into a set of live positions.
//!
//! # Evaluation
//!
//! 1. Comparisons resolve through the attribute indexes
//! 2. Predicates resolve by scanning records
//! 3. Results combine with set algebra
//!
//! # Invariants
//!
//! - Results are ascending and contain live positions only
//! - Indexed and scanned resolution of the same comparison agree

mod evaluator;
mod filters;

pub use evaluator::QueryEvaluator;
pub use filters::RecordFilter;

use crate::index::{AttributeIndex, Generation};

/// Read access to the indexes a query resolves against
pub trait IndexLookup {
    /// Current store generation
    fn generation(&self) -> Generation;

    /// Index for a tracked attribute
    fn index(&self, attribute: &str) -> Option<&AttributeIndex>;
}

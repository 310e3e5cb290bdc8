//! Query evaluator for attrdb
//!
//! Resolves a [`Query`] to the set of live positions it matches.
//!
//! Evaluation order (strict):
//! 1. Reject queries stamped by another store or an older generation
//! 2. Validate every comparison against the tracked attributes
//! 3. Resolve comparisons through the indexes, predicates by scanning
//! 4. Combine with set algebra: `and` intersects, `or` unions, `not`
//!    complements within the live positions
//!
//! Validation runs over the whole tree before any lookup, so a bad term is
//! reported even when a conjunction would short-circuit past it.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::{AttributeIndex, IndexKey, POSITION_ATTRIBUTE};
use crate::observability::Event;
use crate::query::{CompareOp, Node, Predicate, Query};
use crate::storage::{Position, RecordStore};

use super::filters::RecordFilter;
use super::IndexLookup;

/// Evaluates queries against one store's records and indexes
pub struct QueryEvaluator<'a, I: IndexLookup> {
    indices: &'a I,
    records: &'a RecordStore,
    store_id: u64,
}

impl<'a, I: IndexLookup> QueryEvaluator<'a, I> {
    /// Creates an evaluator for the store identified by `store_id`
    pub fn new(indices: &'a I, records: &'a RecordStore, store_id: u64) -> Self {
        Self {
            indices,
            records,
            store_id,
        }
    }

    /// Matching live positions, ascending.
    ///
    /// Deterministic: same query and same store state give the same set.
    pub fn evaluate(&self, query: &Query) -> StoreResult<BTreeSet<Position>> {
        self.check_stamps(query)?;
        self.validate(query.node())?;
        let positions = self.eval(query.node(), None)?;
        trace!(
            target: "attrdb::query",
            event = %Event::QueryEvaluated,
            matches = positions.len(),
        );
        Ok(positions)
    }

    fn check_stamps(&self, query: &Query) -> StoreResult<()> {
        let current = self.indices.generation();
        for stamp in query.stamps() {
            if stamp.store_id != self.store_id {
                return Err(StoreError::invalid_query(
                    "query was built from another store's fields",
                ));
            }
            if stamp.generation != current {
                warn!(
                    target: "attrdb::query",
                    event = %Event::StaleQueryRejected,
                    built = stamp.generation,
                    current,
                );
                return Err(StoreError::StaleQuery {
                    built: stamp.generation,
                    current,
                });
            }
        }
        Ok(())
    }

    fn validate(&self, node: &Node) -> StoreResult<()> {
        match node {
            Node::Empty => Ok(()),
            Node::Compare {
                attribute,
                op,
                value,
            } => {
                if attribute == POSITION_ATTRIBUTE {
                    if op.is_ordered() && RecordFilter::position_bound(value).is_none() {
                        return Err(StoreError::type_mismatch(format!(
                            "'{attribute} {op}' needs an integer bound, got {value}"
                        )));
                    }
                    return Ok(());
                }
                let index = self.index(attribute)?;
                if op.is_ordered() && !IndexKey::from_json(value).kind().is_orderable() {
                    return Err(StoreError::type_mismatch(format!(
                        "'{} {op}' cannot order against {value}",
                        index.attribute()
                    )));
                }
                Ok(())
            }
            Node::Predicate(predicate) => match predicate.attribute() {
                Some(attribute) if attribute != POSITION_ATTRIBUTE => {
                    self.index(attribute).map(|_| ())
                }
                _ => Ok(()),
            },
            Node::And(left, right) | Node::Or(left, right) => {
                self.validate(left)?;
                self.validate(right)
            }
            Node::Not(inner) => self.validate(inner),
        }
    }

    /// Index for `attribute`, which must be tracked and current
    fn index(&self, attribute: &str) -> StoreResult<&'a AttributeIndex> {
        let index = self
            .indices
            .index(attribute)
            .ok_or_else(|| StoreError::unknown_attribute(attribute))?;
        let current = self.indices.generation();
        if index.generation() != current {
            return Err(StoreError::StaleQuery {
                built: index.generation(),
                current,
            });
        }
        Ok(index)
    }

    /// `within` restricts scans to already-known candidates
    fn eval(&self, node: &Node, within: Option<&BTreeSet<Position>>) -> StoreResult<BTreeSet<Position>> {
        match node {
            Node::Empty => Ok(BTreeSet::new()),
            Node::Compare {
                attribute,
                op,
                value,
            } => self.compare(attribute, *op, value),
            Node::Predicate(predicate) => self.scan(predicate, within),
            Node::And(left, right) => {
                // Index-backed side first so the scan only visits its matches
                let (first, second) = if is_scan(left) && !is_scan(right) {
                    (right, left)
                } else {
                    (left, right)
                };
                let candidates = self.eval(first, within)?;
                if candidates.is_empty() {
                    return Ok(candidates);
                }
                let rest = self.eval(second, Some(&candidates))?;
                Ok(candidates.intersection(&rest).copied().collect())
            }
            Node::Or(left, right) => {
                let mut positions = self.eval(left, within)?;
                positions.extend(self.eval(right, within)?);
                Ok(positions)
            }
            Node::Not(inner) => {
                let excluded = self.eval(inner, within)?;
                let universe = match within {
                    Some(candidates) => candidates.clone(),
                    None => self.records.live_positions().collect(),
                };
                Ok(universe.difference(&excluded).copied().collect())
            }
        }
    }

    fn compare(&self, attribute: &str, op: CompareOp, value: &Value) -> StoreResult<BTreeSet<Position>> {
        if attribute == POSITION_ATTRIBUTE {
            return Ok(self.compare_position(op, value));
        }
        let index = self.index(attribute)?;
        Ok(match op {
            CompareOp::Eq => index.lookup_eq(value),
            _ => index.lookup_range(op, value),
        })
    }

    fn compare_position(&self, op: CompareOp, value: &Value) -> BTreeSet<Position> {
        if op == CompareOp::Eq {
            return RecordFilter::position_bound(value)
                .and_then(|bound| Position::try_from(bound).ok())
                .filter(|&position| self.records.is_live(position))
                .into_iter()
                .collect();
        }
        self.records
            .live_positions()
            .filter(|&position| RecordFilter::position_matches(position, op, value))
            .collect()
    }

    fn scan(&self, predicate: &Predicate, within: Option<&BTreeSet<Position>>) -> StoreResult<BTreeSet<Position>> {
        let mut positions = BTreeSet::new();
        match within {
            Some(candidates) => {
                for &position in candidates {
                    let record = self.records.get(position)?;
                    if RecordFilter::predicate_matches(record, position, predicate) {
                        positions.insert(position);
                    }
                }
            }
            None => {
                for (position, record) in self.records.iter() {
                    if RecordFilter::predicate_matches(record, position, predicate) {
                        positions.insert(position);
                    }
                }
            }
        }
        Ok(positions)
    }
}

/// Returns true if resolving `node` requires a scan
fn is_scan(node: &Node) -> bool {
    match node {
        Node::Predicate(_) => true,
        Node::And(left, right) => is_scan(left) && is_scan(right),
        Node::Or(left, right) => is_scan(left) || is_scan(right),
        Node::Not(inner) => is_scan(inner),
        Node::Empty | Node::Compare { .. } => false,
    }
}

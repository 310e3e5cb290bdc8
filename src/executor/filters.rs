//! Per-record query matching
//!
//! Decides whether one record matches a query tree without touching any
//! index. The evaluator uses it to resolve predicates; it is also the
//! linear-scan baseline the index path must agree with.
//!
//! Semantics mirror the indexes exactly: sequences match by membership,
//! ordered comparisons only consider values of the bound's kind, and `!=`
//! requires the attribute to be present.

use serde_json::{json, Value};

use crate::index::{IndexKey, POSITION_ATTRIBUTE};
use crate::query::{CompareOp, Node, Predicate};
use crate::storage::{Position, Record};

/// Evaluates query trees against single records
pub struct RecordFilter;

impl RecordFilter {
    /// Checks if the record at `position` matches `node`
    pub fn matches(record: &dyn Record, position: Position, node: &Node) -> bool {
        match node {
            Node::Empty => false,
            Node::Compare {
                attribute,
                op,
                value,
            } => {
                if attribute == POSITION_ATTRIBUTE {
                    Self::position_matches(position, *op, value)
                } else {
                    match record.get(attribute) {
                        Some(actual) => Self::value_matches(&actual, *op, value),
                        None => false,
                    }
                }
            }
            Node::Predicate(predicate) => Self::predicate_matches(record, position, predicate),
            Node::And(left, right) => {
                Self::matches(record, position, left) && Self::matches(record, position, right)
            }
            Node::Or(left, right) => {
                Self::matches(record, position, left) || Self::matches(record, position, right)
            }
            Node::Not(inner) => !Self::matches(record, position, inner),
        }
    }

    /// Applies a predicate to the record at `position`
    pub fn predicate_matches(record: &dyn Record, position: Position, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Record(test) => test(record),
            Predicate::Attribute { attribute, test } if attribute == POSITION_ATTRIBUTE => {
                test(&json!(position))
            }
            Predicate::Attribute { attribute, test } => match record.get(attribute) {
                Some(value) => test(&value),
                None => false,
            },
        }
    }

    /// Compares a stored value against a literal
    pub fn value_matches(actual: &Value, op: CompareOp, expected: &Value) -> bool {
        let keys = IndexKey::keys_for(actual);
        match op {
            CompareOp::Eq => Self::eq_match(&keys, expected),
            CompareOp::Ne => !Self::eq_match(&keys, expected),
            _ => {
                let bound = IndexKey::from_json(expected);
                keys.iter().any(|key| {
                    key.kind() == bound.kind()
                        && match op {
                            CompareOp::Lt => *key < bound,
                            CompareOp::Le => *key <= bound,
                            CompareOp::Gt => *key > bound,
                            _ => *key >= bound,
                        }
                })
            }
        }
    }

    fn eq_match(keys: &[IndexKey], expected: &Value) -> bool {
        match expected {
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .all(|item| keys.contains(&IndexKey::from_json(item))),
            _ => keys.contains(&IndexKey::from_json(expected)),
        }
    }

    /// Integral bound for a position comparison; integral floats count
    pub(crate) fn position_bound(expected: &Value) -> Option<i128> {
        if let Some(u) = expected.as_u64() {
            return Some(i128::from(u));
        }
        if let Some(i) = expected.as_i64() {
            return Some(i128::from(i));
        }
        expected
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 1e38)
            .map(|f| f as i128)
    }

    pub(crate) fn position_matches(position: Position, op: CompareOp, expected: &Value) -> bool {
        let Some(bound) = Self::position_bound(expected) else {
            return op == CompareOp::Ne;
        };
        let position = position as i128;
        match op {
            CompareOp::Eq => position == bound,
            CompareOp::Ne => position != bound,
            CompareOp::Lt => position < bound,
            CompareOp::Le => position <= bound,
            CompareOp::Gt => position > bound,
            CompareOp::Ge => position >= bound,
        }
    }
}

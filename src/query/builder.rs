//! Field proxies: the query-building entry point
//!
//! `store.fields()` returns a [`Fields`] bound to the store and its current
//! generation. Every query it builds carries that stamp.
//!
//! ```ignore
//! let f = store.fields();
//! let q = f.attr("born").le(1940).and(f.attr("role").eq("producer"));
//! ```

use std::rc::Rc;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::index::{Generation, FILTER_ATTRIBUTE, POSITION_ATTRIBUTE};
use crate::storage::Record;

use super::ast::{CompareOp, Node, Predicate, Query, Stamp};

/// Query builder bound to one store generation.
#[derive(Debug, Clone)]
pub struct Fields {
    stamp: Stamp,
    /// Whether the store tracked an attribute named `filter` at build time
    filter_collides: bool,
}

impl Fields {
    pub(crate) fn new(stamp: Stamp, filter_collides: bool) -> Self {
        Self {
            stamp,
            filter_collides,
        }
    }

    /// Generation this builder is bound to
    pub fn generation(&self) -> Generation {
        self.stamp.generation
    }

    /// Proxy for an attribute
    pub fn attr(&self, name: impl Into<String>) -> Field {
        Field {
            attribute: name.into(),
            stamp: self.stamp,
        }
    }

    /// Proxy for the synthetic position attribute
    pub fn position(&self) -> Field {
        self.attr(POSITION_ATTRIBUTE)
    }

    /// Whole-record predicate.
    ///
    /// Fails with `TypeMismatch` when the store tracks an attribute named
    /// `filter`, since the name is ambiguous there; use [`scan`](Self::scan).
    pub fn filter(&self, test: impl Fn(&dyn Record) -> bool + 'static) -> StoreResult<Query> {
        if self.filter_collides {
            return Err(StoreError::type_mismatch(format!(
                "'{FILTER_ATTRIBUTE}' is a tracked attribute; use scan() for record predicates"
            )));
        }
        Ok(self.scan(test))
    }

    /// Whole-record predicate, always available. Resolved by a full scan.
    pub fn scan(&self, test: impl Fn(&dyn Record) -> bool + 'static) -> Query {
        Query::stamped(Node::Predicate(Predicate::Record(Rc::new(test))), self.stamp)
    }
}

/// Proxy for a single attribute.
///
/// Converting a bare proxy into a [`Query`] yields a query matching nothing.
#[derive(Debug, Clone)]
pub struct Field {
    attribute: String,
    stamp: Stamp,
}

impl Field {
    /// Attribute name
    pub fn name(&self) -> &str {
        &self.attribute
    }

    /// Comparison against a literal
    pub fn compare(&self, op: CompareOp, value: impl Into<Value>) -> Query {
        Query::stamped(
            Node::Compare {
                attribute: self.attribute.clone(),
                op,
                value: value.into(),
            },
            self.stamp,
        )
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Eq, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn ne(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Ne, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn lt(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Lt, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn le(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Le, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn gt(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Gt, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn ge(&self, value: impl Into<Value>) -> Query {
        self.compare(CompareOp::Ge, value)
    }

    /// Predicate over this attribute's value. Resolved by a full scan.
    pub fn matches(&self, test: impl Fn(&Value) -> bool + 'static) -> Query {
        Query::stamped(
            Node::Predicate(Predicate::Attribute {
                attribute: self.attribute.clone(),
                test: Rc::new(test),
            }),
            self.stamp,
        )
    }
}

impl From<Field> for Query {
    fn from(field: Field) -> Self {
        Query::stamped(Node::Empty, field.stamp)
    }
}

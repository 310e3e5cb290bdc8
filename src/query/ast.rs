//! Query expression tree
//!
//! A [`Query`] is an immutable tree of comparisons and predicates combined
//! with conjunction, disjunction and negation. Combinators consume their
//! operands and return a new tree; nothing is ever mutated in place.
//!
//! Queries built through a field proxy carry a [`Stamp`] naming the store
//! and generation they were built under. Mapping sugar is unstamped and
//! therefore never goes stale.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::index::Generation;
use crate::storage::Record;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Operator symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Returns true for operators that need an ordering
    pub fn is_ordered(&self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Arbitrary per-record test. Always resolved by scanning.
#[derive(Clone)]
pub enum Predicate {
    /// Applied to the whole record
    Record(Rc<dyn Fn(&dyn Record) -> bool>),
    /// Applied to one attribute's value; records lacking it never match
    Attribute {
        attribute: String,
        test: Rc<dyn Fn(&Value) -> bool>,
    },
}

impl Predicate {
    /// Attribute the predicate reads, if it reads only one
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Predicate::Record(_) => None,
            Predicate::Attribute { attribute, .. } => Some(attribute),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Record(_) => f.write_str("Predicate::Record(..)"),
            Predicate::Attribute { attribute, .. } => {
                write!(f, "Predicate::Attribute({attribute}, ..)")
            }
        }
    }
}

/// Node of a query tree
#[derive(Debug, Clone)]
pub enum Node {
    /// Matches nothing
    Empty,
    Compare {
        attribute: String,
        op: CompareOp,
        value: Value,
    },
    Predicate(Predicate),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

/// Store and generation a query was built under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp {
    pub store_id: u64,
    pub generation: Generation,
}

/// Immutable query expression.
#[derive(Debug, Clone)]
pub struct Query {
    node: Node,
    stamps: Vec<Stamp>,
}

impl Query {
    /// Wraps a node into an unstamped query
    pub fn new(node: Node) -> Self {
        Self {
            node,
            stamps: Vec::new(),
        }
    }

    pub(crate) fn stamped(node: Node, stamp: Stamp) -> Self {
        Self {
            node,
            stamps: vec![stamp],
        }
    }

    /// Query matching nothing
    pub fn empty() -> Self {
        Self::new(Node::Empty)
    }

    /// Unstamped comparison
    pub fn compare(attribute: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::new(Node::Compare {
            attribute: attribute.into(),
            op,
            value: value.into(),
        })
    }

    /// Conjunction of equality comparisons, one per entry.
    ///
    /// An empty mapping yields the empty query.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self::all(
            map.iter()
                .map(|(name, value)| Self::compare(name.clone(), CompareOp::Eq, value.clone())),
        )
    }

    /// Conjunction of all `queries`; the empty query if there are none.
    pub fn all(queries: impl IntoIterator<Item = Query>) -> Self {
        queries
            .into_iter()
            .reduce(Query::and)
            .unwrap_or_else(Query::empty)
    }

    /// Root node
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Stamps of every proxy that contributed to this query
    pub fn stamps(&self) -> &[Stamp] {
        &self.stamps
    }

    /// Returns true if the query has no terms at all
    pub fn is_empty(&self) -> bool {
        matches!(self.node, Node::Empty)
    }

    fn combine(self, other: Query, node: impl FnOnce(Box<Node>, Box<Node>) -> Node) -> Self {
        let mut stamps = self.stamps;
        for stamp in other.stamps {
            if !stamps.contains(&stamp) {
                stamps.push(stamp);
            }
        }
        Self {
            node: node(Box::new(self.node), Box::new(other.node)),
            stamps,
        }
    }

    /// Matches records matching both queries
    pub fn and(self, other: Query) -> Self {
        self.combine(other, Node::And)
    }

    /// Matches records matching either query
    pub fn or(self, other: Query) -> Self {
        self.combine(other, Node::Or)
    }

    /// Matches live records not matching this query
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self {
            node: Node::Not(Box::new(self.node)),
            stamps: self.stamps,
        }
    }
}

/// Conjunction of two queries
pub fn and(a: Query, b: Query) -> Query {
    a.and(b)
}

/// Disjunction of two queries
pub fn or(a: Query, b: Query) -> Query {
    a.or(b)
}

/// Negation of a query
pub fn not(a: Query) -> Query {
    a.not()
}

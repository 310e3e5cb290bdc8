//! Selectors: everything the store accepts where it expects a query
//!
//! Besides a [`Query`], callers may pass a mapping (sugar for equality on
//! each entry), a JSON value holding such a mapping, a shared record handle
//! (equality on each of its tracked attributes) or several selectors at
//! once, which are conjoined.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::index::IndexManager;
use crate::storage::{Record, SharedRecord};

use super::ast::{CompareOp, Query};
use super::builder::Field;

/// Anything that resolves to a [`Query`].
#[derive(Clone)]
pub enum Selector {
    Query(Query),
    Map(Map<String, Value>),
    Value(Value),
    Shared(SharedRecord),
    All(Vec<Selector>),
}

impl Selector {
    /// Conjunction of several selectors
    pub fn all(selectors: impl IntoIterator<Item = impl Into<Selector>>) -> Self {
        Selector::All(selectors.into_iter().map(Into::into).collect())
    }

    /// Single `attribute == value` term
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Selector::Query(Query::compare(attribute, CompareOp::Eq, value))
    }

    /// Equality on each tracked attribute of a caller-owned record
    pub fn shared<T: Record + 'static>(handle: &Rc<RefCell<T>>) -> Self {
        let handle: SharedRecord = handle.clone();
        Selector::Shared(handle)
    }

    /// Resolves the selector against the store's indexes.
    ///
    /// Attributes of a shared record that the store does not track are
    /// skipped. A non-object JSON value is rejected.
    pub(crate) fn into_query(self, indices: &IndexManager) -> StoreResult<Query> {
        match self {
            Selector::Query(query) => Ok(query),
            Selector::Map(map) => Ok(Query::from_map(&map)),
            Selector::Value(Value::Object(map)) => Ok(Query::from_map(&map)),
            Selector::Value(other) => Err(StoreError::invalid_query(format!(
                "expected a query, a mapping or a record, got {other}"
            ))),
            Selector::Shared(handle) => {
                let record = handle.borrow();
                let terms: Vec<Query> = record
                    .attribute_names()
                    .into_iter()
                    .filter(|name| indices.contains(name))
                    .filter_map(|name| {
                        record
                            .get(&name)
                            .map(|value| Query::compare(name.clone(), CompareOp::Eq, value.into_owned()))
                    })
                    .collect();
                Ok(Query::all(terms))
            }
            Selector::All(selectors) => {
                let queries = selectors
                    .into_iter()
                    .map(|selector| selector.into_query(indices))
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(Query::all(queries))
            }
        }
    }
}

impl From<Vec<Selector>> for Selector {
    fn from(selectors: Vec<Selector>) -> Self {
        Selector::All(selectors)
    }
}

impl From<Query> for Selector {
    fn from(query: Query) -> Self {
        Selector::Query(query)
    }
}

impl From<Field> for Selector {
    fn from(field: Field) -> Self {
        Selector::Query(field.into())
    }
}

impl From<Map<String, Value>> for Selector {
    fn from(map: Map<String, Value>) -> Self {
        Selector::Map(map)
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        Selector::Value(value)
    }
}

impl From<SharedRecord> for Selector {
    fn from(handle: SharedRecord) -> Self {
        Selector::Shared(handle)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Query(query) => f.debug_tuple("Query").field(query).finish(),
            Selector::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Selector::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Selector::Shared(_) => f.write_str("Shared(..)"),
            Selector::All(selectors) => f.debug_tuple("All").field(selectors).finish(),
        }
    }
}

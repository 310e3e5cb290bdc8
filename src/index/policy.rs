//! Attribute admission policy and default values

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Synthetic attribute resolving to a record's own position.
pub const POSITION_ATTRIBUTE: &str = "_position";

/// Attribute name that collides with the `filter` predicate builder.
pub const FILTER_ATTRIBUTE: &str = "filter";

/// Which attribute names a store may track.
///
/// The deny-list is absolute. The allow-list only restricts attributes that
/// arrive implicitly on records; an explicit declaration may extend it.
#[derive(Debug, Clone, Default)]
pub struct AttributePolicy {
    allowed: Option<BTreeSet<String>>,
    excluded: BTreeSet<String>,
}

impl AttributePolicy {
    /// Creates a policy from an optional allow-list and a deny-list
    pub fn new(allowed: Option<Vec<String>>, excluded: Vec<String>) -> Self {
        Self {
            allowed: allowed.map(|names| names.into_iter().collect()),
            excluded: excluded.into_iter().collect(),
        }
    }

    /// Returns true if `name` is on the deny-list
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Allow-list, if one is configured
    pub fn allowed(&self) -> Option<&BTreeSet<String>> {
        self.allowed.as_ref()
    }

    /// Checks an attribute arriving on a record or an update.
    pub fn check_implicit(&self, name: &str) -> StoreResult<()> {
        self.check_explicit(name)?;
        match &self.allowed {
            Some(allowed) if !allowed.contains(name) => {
                Err(StoreError::forbidden(name, "not in the allowed attributes"))
            }
            _ => Ok(()),
        }
    }

    /// Checks an attribute named by `declare_attribute` or `reindex`.
    pub fn check_explicit(&self, name: &str) -> StoreResult<()> {
        if name == POSITION_ATTRIBUTE {
            return Err(StoreError::forbidden(name, "reserved for record positions"));
        }
        if self.is_excluded(name) {
            return Err(StoreError::forbidden(name, "excluded"));
        }
        Ok(())
    }

    /// Records an explicit declaration so later records may carry `name`.
    pub fn admit(&mut self, name: &str) {
        if let Some(allowed) = &mut self.allowed {
            allowed.insert(name.to_string());
        }
    }
}

/// Value given to records that lack an attribute.
///
/// A `Constant` is cloned into every record that receives it, so records
/// never share the value: changing one record's copy leaves the others and
/// the constant itself untouched. A `Factory` is called once per missing
/// occurrence.
pub enum DefaultValue {
    Constant(Value),
    Factory(Box<dyn FnMut() -> Value>),
}

impl DefaultValue {
    /// Wraps a callable producing a fresh value per use
    pub fn factory(f: impl FnMut() -> Value + 'static) -> Self {
        DefaultValue::Factory(Box::new(f))
    }

    /// Produces the value for one record
    pub fn produce(&mut self) -> Value {
        match self {
            DefaultValue::Constant(value) => value.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl Default for DefaultValue {
    fn default() -> Self {
        DefaultValue::Constant(Value::Null)
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Constant(value)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

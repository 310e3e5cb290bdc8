//! Record capability set
//!
//! The engine never looks inside a record except through [`Record`]:
//! `get`, `set`, `has` and the list of attribute names. Two variants are
//! stored:
//!
//! - `Owned`: a JSON object the store owns outright (inserted by value)
//! - `Shared`: a reference to a caller-owned object; backfilled defaults and
//!   updates are written through this handle, so every holder observes them

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

/// Something that exposes named attributes.
pub trait Record {
    /// Returns the value of an attribute, if present
    fn get(&self, name: &str) -> Option<Cow<'_, Value>>;

    /// Sets an attribute, adding it if absent
    fn set(&mut self, name: &str, value: Value);

    /// Returns true if the attribute is present
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the names of all present attributes
    fn attribute_names(&self) -> Vec<String>;
}

impl Record for Map<String, Value> {
    fn get(&self, name: &str) -> Option<Cow<'_, Value>> {
        Map::get(self, name).map(Cow::Borrowed)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }

    fn has(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// Handle to a caller-owned record.
pub type SharedRecord = Rc<RefCell<dyn Record>>;

/// A record as held by the store.
pub enum StoredRecord {
    /// Record owned by the store
    Owned(Map<String, Value>),
    /// Record owned by the caller and mutated through the shared handle
    Shared(SharedRecord),
}

impl StoredRecord {
    /// Wraps a caller-owned record. The store keeps a clone of the handle.
    pub fn shared<T: Record + 'static>(handle: Rc<RefCell<T>>) -> Self {
        StoredRecord::Shared(handle)
    }

    /// Returns true if this is a shared record backed by `handle`
    pub fn points_to<T: ?Sized>(&self, handle: &Rc<RefCell<T>>) -> bool {
        match self {
            StoredRecord::Shared(inner) => {
                Rc::as_ptr(inner) as *const () == Rc::as_ptr(handle) as *const ()
            }
            StoredRecord::Owned(_) => false,
        }
    }

    /// Returns the owned mapping, if this is an owned record
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            StoredRecord::Owned(map) => Some(map),
            StoredRecord::Shared(_) => None,
        }
    }

    /// Returns the shared handle, if this is a shared record
    pub fn as_shared(&self) -> Option<&SharedRecord> {
        match self {
            StoredRecord::Owned(_) => None,
            StoredRecord::Shared(handle) => Some(handle),
        }
    }

    /// Snapshot of all attributes as a JSON object
    pub fn to_value(&self) -> Value {
        match self {
            StoredRecord::Owned(map) => Value::Object(map.clone()),
            StoredRecord::Shared(handle) => {
                let record = handle.borrow();
                let mut map = Map::new();
                for name in record.attribute_names() {
                    if let Some(value) = record.get(&name) {
                        map.insert(name, value.into_owned());
                    }
                }
                Value::Object(map)
            }
        }
    }
}

impl Record for StoredRecord {
    fn get(&self, name: &str) -> Option<Cow<'_, Value>> {
        match self {
            StoredRecord::Owned(map) => Map::get(map, name).map(Cow::Borrowed),
            StoredRecord::Shared(handle) => handle
                .borrow()
                .get(name)
                .map(|value| Cow::Owned(value.into_owned())),
        }
    }

    fn set(&mut self, name: &str, value: Value) {
        match self {
            StoredRecord::Owned(map) => {
                map.insert(name.to_string(), value);
            }
            StoredRecord::Shared(handle) => handle.borrow_mut().set(name, value),
        }
    }

    fn has(&self, name: &str) -> bool {
        match self {
            StoredRecord::Owned(map) => map.contains_key(name),
            StoredRecord::Shared(handle) => handle.borrow().has(name),
        }
    }

    fn attribute_names(&self) -> Vec<String> {
        match self {
            StoredRecord::Owned(map) => map.keys().cloned().collect(),
            StoredRecord::Shared(handle) => handle.borrow().attribute_names(),
        }
    }
}

impl From<Map<String, Value>> for StoredRecord {
    fn from(map: Map<String, Value>) -> Self {
        StoredRecord::Owned(map)
    }
}

impl From<SharedRecord> for StoredRecord {
    fn from(handle: SharedRecord) -> Self {
        StoredRecord::Shared(handle)
    }
}

impl fmt::Debug for StoredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredRecord::Owned(map) => f.debug_tuple("Owned").field(map).finish(),
            StoredRecord::Shared(_) => f.debug_tuple("Shared").field(&self.to_value()).finish(),
        }
    }
}

impl PartialEq<Value> for StoredRecord {
    fn eq(&self, other: &Value) -> bool {
        &self.to_value() == other
    }
}

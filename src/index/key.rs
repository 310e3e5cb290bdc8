//! Index keys: orderable surrogates for attribute values
//!
//! Every JSON value maps to an [`IndexKey`]. Keys are totally ordered so they
//! can live in a `BTreeMap`; ordering first groups keys by kind
//! (Null < Bool < Number < String < Seq < Object < Empty) and then compares
//! within the kind. Range queries only ever walk keys of the bound's kind, so
//! a heterogeneous value is never compared against the bound.
//!
//! Integers and floats share the Number kind: `1` and `1.0` are the same key.
//! Integers are held exactly (the full `i64` and `u64` ranges) and compared
//! against floats without rounding either side.

use std::cmp::Ordering;

use serde_json::Value;

/// Kind of an [`IndexKey`]; range queries stay within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyKind {
    Null,
    Bool,
    Number,
    String,
    Seq,
    Object,
    Empty,
}

impl KeyKind {
    /// Returns true if keys of this kind have a meaningful order
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            KeyKind::Bool | KeyKind::Number | KeyKind::String | KeyKind::Seq
        )
    }
}

/// Hashable, orderable stand-in for an attribute value.
#[derive(Debug, Clone)]
pub enum IndexKey {
    Null,
    Bool(bool),
    /// Any JSON integer, `i64` or `u64`
    Int(i128),
    /// Never negative zero
    Float(f64),
    String(String),
    /// Nested sequence, compared element-wise
    Seq(Vec<IndexKey>),
    /// Object, keyed by its canonical JSON text
    Object(String),
    /// Empty sequence
    Empty,
}

impl IndexKey {
    /// Create a key from a float, folding -0.0 into 0.0
    pub fn from_float(v: f64) -> Self {
        IndexKey::Float(if v == 0.0 { 0.0 } else { v })
    }

    /// Create a key from a JSON value.
    ///
    /// Sequences become [`IndexKey::Seq`] (or [`IndexKey::Empty`]); use
    /// [`IndexKey::keys_for`] when indexing a stored value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    IndexKey::Int(i128::from(u))
                } else if let Some(f) = n.as_f64() {
                    IndexKey::from_float(f)
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Array(items) if items.is_empty() => IndexKey::Empty,
            Value::Array(items) => IndexKey::Seq(items.iter().map(IndexKey::from_json).collect()),
            // serde_json's default Map keeps keys sorted, so this is canonical
            Value::Object(_) => IndexKey::Object(value.to_string()),
        }
    }

    /// Keys under which a stored value is indexed.
    ///
    /// A non-empty sequence is indexed under each distinct element, so that
    /// membership queries resolve through the index. Anything else maps to a
    /// single key.
    pub fn keys_for(value: &Value) -> Vec<IndexKey> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                let mut keys: Vec<IndexKey> = items.iter().map(IndexKey::from_json).collect();
                keys.sort();
                keys.dedup();
                keys
            }
            _ => vec![IndexKey::from_json(value)],
        }
    }

    /// Returns the kind of this key
    pub fn kind(&self) -> KeyKind {
        match self {
            IndexKey::Null => KeyKind::Null,
            IndexKey::Bool(_) => KeyKind::Bool,
            IndexKey::Int(_) | IndexKey::Float(_) => KeyKind::Number,
            IndexKey::String(_) => KeyKind::String,
            IndexKey::Seq(_) => KeyKind::Seq,
            IndexKey::Object(_) => KeyKind::Object,
            IndexKey::Empty => KeyKind::Empty,
        }
    }
}

/// 2^127 as a float; every `i128` lies strictly below it in magnitude
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Exact comparison of an integer against a float
fn compare_int_float(x: i128, y: f64) -> Ordering {
    if y >= I128_BOUND {
        return Ordering::Less;
    }
    if y < -I128_BOUND {
        return Ordering::Greater;
    }
    let floor = y.floor();
    // In range, so the cast is exact
    match x.cmp(&(floor as i128)) {
        Ordering::Equal if y > floor => Ordering::Less,
        other => other,
    }
}

fn compare_numbers(a: &IndexKey, b: &IndexKey) -> Ordering {
    match (a, b) {
        (IndexKey::Int(x), IndexKey::Int(y)) => x.cmp(y),
        (IndexKey::Float(x), IndexKey::Float(y)) => x.total_cmp(y),
        (IndexKey::Int(x), IndexKey::Float(y)) => compare_int_float(*x, *y),
        (IndexKey::Float(x), IndexKey::Int(y)) => compare_int_float(*y, *x).reverse(),
        _ => Ordering::Equal,
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_kind = self.kind().cmp(&other.kind());
        if by_kind != Ordering::Equal {
            return by_kind;
        }
        match (self, other) {
            (IndexKey::Bool(a), IndexKey::Bool(b)) => a.cmp(b),
            (IndexKey::String(a), IndexKey::String(b)) => a.cmp(b),
            (IndexKey::Seq(a), IndexKey::Seq(b)) => a.cmp(b),
            (IndexKey::Object(a), IndexKey::Object(b)) => a.cmp(b),
            (IndexKey::Int(_) | IndexKey::Float(_), _) => compare_numbers(self, other),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

//! Shared Record Tests
//!
//! Tests for caller-owned records inserted by handle:
//! - Backfills and updates write through to the caller's object
//! - Queries return the caller's object, not a copy
//! - A record handle works as a selector
//! - Direct changes need a reindex before queries see them

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use attrdb::{and, not, ReturnMode, Record, Selector, Store};
use serde_json::{json, Map, Value};

// =============================================================================
// Helper Types
// =============================================================================

/// Plain attribute bag standing in for an application object
#[derive(Debug, Default)]
struct Obj {
    attrs: BTreeMap<String, Value>,
}

impl Obj {
    fn new(value: Value) -> Rc<RefCell<Obj>> {
        let attrs = value
            .as_object()
            .expect("object")
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Rc::new(RefCell::new(Obj { attrs }))
    }
}

impl Record for Obj {
    fn get(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.attrs.get(name).map(Cow::Borrowed)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attrs.keys().cloned().collect()
    }
}

fn record(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("record must be an object")
}

fn attr(handle: &Rc<RefCell<Obj>>, name: &str) -> Option<Value> {
    handle.borrow().attrs.get(name).cloned()
}

/// Store holding A = {a: 1, b: 2} by handle and an owned {a: 2, b: 3, c: 4}
fn store_with_a() -> (Store, Rc<RefCell<Obj>>) {
    let mut store = Store::builder().return_mode(ReturnMode::Auto).build().unwrap();
    let a = Obj::new(json!({"a": 1, "b": 2}));
    store.insert_shared(&a).unwrap();
    store.insert(record(json!({"a": 2, "b": 3, "c": 4}))).unwrap();
    (store, a)
}

// =============================================================================
// Insertion
// =============================================================================

/// A later record's new attribute is backfilled through the handle.
#[test]
fn test_backfill_writes_through() {
    let (store, a) = store_with_a();

    assert!(store.get(0).unwrap().points_to(&a));
    assert!(store.get(0).unwrap().as_shared().is_some());
    assert_eq!(attr(&a, "c"), Some(Value::Null));
    assert_eq!(store.get(1).unwrap(), &json!({"a": 2, "b": 3, "c": 4}));
}

/// Every way of asking for A returns A itself.
#[test]
fn test_queries_return_the_handle() {
    let (store, a) = store_with_a();
    let f = store.fields();

    assert!(store.query_one(json!({"a": 1})).unwrap().points_to(&a));
    assert!(store.query_one(f.attr("a").eq(1)).unwrap().points_to(&a));
    assert!(store.query_one(Selector::shared(&a)).unwrap().points_to(&a));
    assert!(store.query(json!({"a": 1})).unwrap().one().unwrap().points_to(&a));
}

/// A handle selects on tracked attributes only; unlisted ones are ignored.
#[test]
fn test_handle_selector_under_allow_list() {
    let mut store = Store::builder()
        .allowed_attributes(["a"])
        .strict_admission(false)
        .return_mode(ReturnMode::Auto)
        .build()
        .unwrap();
    let a = Obj::new(json!({"a": 1, "b": 2}));
    store.insert_shared(&a).unwrap();
    store.insert(record(json!({"a": 2, "b": 2}))).unwrap();

    assert_eq!(store.attributes(), vec!["a"]);
    assert!(store.query_one(Selector::shared(&a)).unwrap().points_to(&a));
    assert!(store.contains(Selector::shared(&a)).unwrap());

    assert_eq!(store.update(json!({"a": 3}), Selector::shared(&a)).unwrap(), 1);
    assert_eq!(attr(&a, "a"), Some(json!(3)));
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn test_ranges_over_shared_records() {
    let (store, a) = store_with_a();
    let f = store.fields();

    assert!(store.query_one(f.attr("a").lt(2)).unwrap().points_to(&a));
    assert!(store.query_one(f.attr("a").le(1)).unwrap().points_to(&a));
    assert!(!store.query_one(f.attr("b").gt(2)).unwrap().points_to(&a));
    assert!(!store.query_one(f.attr("b").ge(3)).unwrap().points_to(&a));
    assert!(store.query_one(f.attr("a").ne(2)).unwrap().points_to(&a));
    assert!(store.query_one(not(f.attr("a").eq(2))).unwrap().points_to(&a));
    assert!(store
        .query_list(and(f.attr("b").gt(2), f.attr("a").lt(2)))
        .unwrap()
        .is_empty());
}

#[test]
fn test_predicates_over_shared_records() {
    let (store, a) = store_with_a();
    let f = store.fields();
    let is_one = |r: &dyn Record| r.get("a").as_deref() == Some(&json!(1));

    assert!(store.query_one(f.filter(is_one).unwrap()).unwrap().points_to(&a));
    assert!(store.query_one(f.scan(is_one)).unwrap().points_to(&a));
}

// =============================================================================
// Out-of-band Changes and Updates
// =============================================================================

/// Direct edits through the handle show up after a reindex.
#[test]
fn test_direct_edit_then_reindex() {
    let (mut store, a) = store_with_a();

    a.borrow_mut().set("c", json!(40));
    assert!(store.query_list(json!({"c": 40})).unwrap().is_empty());

    store.reindex(None).unwrap();
    assert!(store.query_one(json!({"c": 40})).unwrap().points_to(&a));
}

/// Updates selected by the handle propagate to the caller's object.
#[test]
fn test_update_through_handle() {
    let (mut store, a) = store_with_a();

    assert_eq!(store.update(json!({"c": 5}), Selector::shared(&a)).unwrap(), 1);
    assert_eq!(attr(&a, "c"), Some(json!(5)));

    store.update(json!({"b": 50}), Selector::shared(&a)).unwrap();
    assert_eq!(attr(&a, "b"), Some(json!(50)));
    assert!(store.query_one(json!({"b": 50})).unwrap().points_to(&a));
}

/// A handle with the same values selects every matching record.
#[test]
fn test_lookalike_handle_selects_both() {
    let (mut store, a) = store_with_a();
    store.update(json!({"b": 50, "c": 5}), Selector::shared(&a)).unwrap();
    store
        .insert(record(json!({"a": 1, "b": 50, "c": 5, "d": 200})))
        .unwrap();

    let b = Obj::new(json!({"a": 1, "b": 50, "c": 5}));
    let hits = store.query_list(Selector::shared(&b)).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|record| record.points_to(&a)));
    assert!(!hits.iter().any(|record| record.points_to(&b)));

    assert!(store.contains(Selector::shared(&a)).unwrap());
    assert!(store.iter().any(|record| record.points_to(&a)));
}

// =============================================================================
// Removal
// =============================================================================

/// Removing A drops the store's handle; the caller's object survives.
#[test]
fn test_remove_shared_record() {
    let (mut store, a) = store_with_a();
    store
        .insert(record(json!({"a": 1, "b": 50, "c": 5, "d": 200})))
        .unwrap();
    assert_eq!(attr(&a, "d"), Some(Value::Null));
    assert_eq!(Rc::strong_count(&a), 2);

    let before = store.len();
    store.remove(json!({"a": 1, "d": null})).unwrap();

    assert_eq!(store.len(), before - 1);
    assert!(!store.iter().any(|record| record.points_to(&a)));
    assert!(!store.contains(Selector::shared(&a)).unwrap());
    assert_eq!(Rc::strong_count(&a), 1);
    assert_eq!(attr(&a, "a"), Some(json!(1)));

    assert_eq!(
        store.query_one(json!({"a": 2})).unwrap(),
        &json!({"a": 2, "b": 3, "c": 4, "d": null})
    );
}

/// Sequence values on a shared record are indexed element-wise.
#[test]
fn test_shared_sequence_record() {
    let (mut store, _a) = store_with_a();
    let c = Obj::new(json!({"a": [9, 10]}));
    store.insert_shared(&c).unwrap();
    assert_eq!(attr(&c, "b"), Some(Value::Null));

    let f = store.fields();
    assert!(store.query_one(f.attr("a").eq(9)).unwrap().points_to(&c));
    assert!(store
        .query_one(and(f.attr("a").eq(9), f.attr("a").lt(10)))
        .unwrap()
        .points_to(&c));
    assert!(store
        .query_list(and(f.attr("a").eq(8), f.attr("a").lt(10)))
        .unwrap()
        .is_empty());
}

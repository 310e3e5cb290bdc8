//! Defaults and Admission Tests
//!
//! Tests for how attributes come to be tracked:
//! - Implicit declaration on insert, with defaults backfilled
//! - Callable and constant defaults
//! - Explicit declaration and missing defaults
//! - Allow-lists, deny-lists and the reserved position name

use attrdb::{
    ConfigError, DefaultValue, ErrorKind, Record, ReturnMode, Store, StoreConfig, StoredRecord,
};
use serde_json::{json, Map, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn record(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("record must be an object")
}

fn items() -> Vec<Map<String, Value>> {
    [
        json!({"first": "John", "last": "Lennon", "born": 1940, "role": "guitar"}),
        json!({"first": "Paul", "last": "McCartney", "born": 1942, "role": "bass"}),
        json!({"first": "George", "last": "Harrison", "born": 1943, "role": "guitar"}),
        json!({"first": "Ringo", "last": "Starr", "born": 1940, "role": "drums"}),
        json!({"first": "George", "last": "Martin", "born": 1926, "role": "producer", "extra": "test"}),
    ]
    .into_iter()
    .map(record)
    .collect()
}

fn attribute(record: &StoredRecord, name: &str) -> Value {
    record.get(name).map(|value| value.into_owned()).unwrap_or(Value::Null)
}

fn the_beatles() -> Vec<&'static str> {
    vec!["born", "first", "last", "role"]
}

// =============================================================================
// Default Values
// =============================================================================

/// A callable default is invoked once per missing occurrence, in order.
#[test]
fn test_callable_default() {
    let mut next = 0;
    let mut store = Store::builder()
        .default_factory(move || {
            next += 1;
            json!(next - 1)
        })
        .build()
        .unwrap();

    store.insert(record(json!({"a": 1, "b": 2}))).unwrap();
    store.insert(record(json!({"a": 2, "b": 4}))).unwrap();
    store.insert(record(json!({"a": 4, "b": 8, "c": 16}))).unwrap();

    assert_eq!(attribute(store.query_one(json!({"a": 1})).unwrap(), "c"), json!(0));
    assert_eq!(attribute(store.query_one(json!({"a": 2})).unwrap(), "c"), json!(1));

    // The new record lacks `b`: `cc` is backfilled first, then `b`
    store.insert(record(json!({"a": 8, "c": 32, "cc": 64}))).unwrap();

    assert_eq!(attribute(store.query_one(json!({"a": 1})).unwrap(), "cc"), json!(2));
    assert_eq!(attribute(store.query_one(json!({"a": 2})).unwrap(), "cc"), json!(3));
    assert_eq!(attribute(store.query_one(json!({"a": 4})).unwrap(), "cc"), json!(4));
    assert_eq!(attribute(store.query_one(json!({"a": 8})).unwrap(), "b"), json!(5));
}

/// A constant default lands in every gap, and each record owns its copy.
#[test]
fn test_constant_default() {
    let mut store = Store::builder().default_value(json!(5)).build().unwrap();

    store.insert(record(json!({"a": 1, "b": 2}))).unwrap();
    store.insert(record(json!({"a": 2, "b": 4}))).unwrap();
    store.insert(record(json!({"a": 4, "b": 8, "c": 16}))).unwrap();
    store.insert(record(json!({"a": 8, "c": 32, "cc": 64}))).unwrap();

    assert_eq!(attribute(store.get(0).unwrap(), "c"), json!(5));
    assert_eq!(attribute(store.get(1).unwrap(), "c"), json!(5));
    for position in 0..3 {
        assert_eq!(attribute(store.get(position).unwrap(), "cc"), json!(5));
    }
    assert_eq!(attribute(store.get(3).unwrap(), "b"), json!(5));

    store.update(json!({"c": 6}), json!({"a": 1})).unwrap();
    assert_eq!(attribute(store.get(1).unwrap(), "c"), json!(5));
    assert_eq!(store.query_positions(json!({"c": 5})).unwrap().len(), 1);
}

/// Without a configured default, gaps are filled with null.
#[test]
fn test_null_default_counts_missing() {
    let store = Store::from_records(items()).unwrap();
    assert_eq!(store.len(), 5);
    assert_eq!(store.query_list(json!({"extra": null})).unwrap().len(), 4);
    assert_eq!(store.query_list(json!({"extra": "test"})).unwrap().len(), 1);
}

// =============================================================================
// Explicit Declaration
// =============================================================================

/// Declaring without a default needs every record to hold the attribute.
#[test]
fn test_declare_missing_default() {
    let mut store = Store::builder()
        .allowed_attributes(the_beatles())
        .strict_admission(false)
        .return_mode(ReturnMode::List)
        .build()
        .unwrap();
    store.insert_many(items()).unwrap();

    let err = store.query_positions(json!({"extra": "test"})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAttribute);

    let err = store.declare_attribute("extra", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingDefault);
    assert!(!store.attributes().contains(&"extra"));

    let backfilled = store
        .declare_attribute("extra", Some(json!("added").into()))
        .unwrap();
    assert_eq!(backfilled, 4);
    assert_eq!(store.query_list(json!({"extra": "test"})).unwrap().len(), 1);
    assert_eq!(store.query_list(json!({"extra": "added"})).unwrap().len(), 4);
}

/// Declaring on an empty store, then filling the attribute in later.
#[test]
fn test_declare_on_empty_store() {
    let mut store = Store::new();
    assert_eq!(store.declare_attribute("bands", Some(json!([]).into())).unwrap(), 0);
    assert_eq!(store.attributes(), vec!["bands"]);

    store.insert(record(json!({"first": "Pete"}))).unwrap();
    assert_eq!(attribute(store.get(0).unwrap(), "bands"), Value::Null);

    let mut store = Store::new();
    store.insert(record(json!({"first": "Pete"}))).unwrap();
    store
        .declare_attribute("bands", Some(DefaultValue::Constant(json!([]))))
        .unwrap();
    assert_eq!(attribute(store.get(0).unwrap(), "bands"), json!([]));
    assert!(store.contains(json!({"bands": []})).unwrap());
}

/// Redeclaring a tracked attribute is a rebuild, not an error.
#[test]
fn test_redeclare_is_idempotent() {
    let mut store = Store::from_records(items()).unwrap();
    assert_eq!(store.declare_attribute("first", None).unwrap(), 0);
    assert_eq!(store.query_list(json!({"first": "George"})).unwrap().len(), 2);
}

// =============================================================================
// Allow-list
// =============================================================================

/// Strict admission rejects records carrying unlisted attributes.
#[test]
fn test_allow_list_strict() {
    let mut store = Store::builder()
        .allowed_attributes(the_beatles())
        .build()
        .unwrap();

    let err = store.insert_many(items()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
    assert_eq!(store.len(), 4);
}

/// Lenient admission stores the record but leaves the attribute untracked.
#[test]
fn test_allow_list_lenient() {
    let mut store = Store::builder()
        .allowed_attributes(the_beatles())
        .strict_admission(false)
        .build()
        .unwrap();
    store.insert_many(items()).unwrap();

    assert_eq!(store.len(), 5);
    assert_eq!(store.attributes(), the_beatles());
    assert_eq!(attribute(store.get(4).unwrap(), "extra"), json!("test"));
    assert_eq!(
        store.query_positions(json!({"extra": null})).unwrap_err().kind(),
        ErrorKind::UnknownAttribute
    );
}

/// An explicit declaration extends the allow-list for later records.
#[test]
fn test_declaration_extends_allow_list() {
    let mut store = Store::builder()
        .allowed_attributes(["a"])
        .build()
        .unwrap();
    store.insert(record(json!({"a": 1}))).unwrap();
    assert!(store.insert(record(json!({"a": 2, "b": 2}))).is_err());

    store.declare_attribute("b", Some(json!(0).into())).unwrap();
    store.insert(record(json!({"a": 2, "b": 2}))).unwrap();
    assert_eq!(store.query_positions(json!({"b": 0})).unwrap().len(), 1);
}

// =============================================================================
// Deny-list
// =============================================================================

fn squares(strict: bool) -> Store {
    let mut store = Store::builder()
        .excluded_attributes(["i**2"])
        .strict_admission(strict)
        .return_mode(ReturnMode::List)
        .build()
        .unwrap();
    if !strict {
        store
            .insert_many((0..10).map(|i| record(json!({"i": i, "i//2": i / 2, "i**2": i * i}))))
            .unwrap();
    }
    store
}

fn assert_untracked(store: &Store) {
    assert!(!store.attributes().contains(&"i**2"));
    let err = store.query_positions(json!({"i**2": 4})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
}

/// Excluded attributes are never tracked, however they arrive.
#[test]
fn test_excluded_attribute_lenient() {
    let mut store = squares(false);
    assert_untracked(&store);

    store.reindex(None).unwrap();
    assert_untracked(&store);

    assert_eq!(
        store.reindex(Some(&["i**2"])).unwrap_err().kind(),
        ErrorKind::ForbiddenAttribute
    );
    assert_eq!(
        store.declare_attribute("i**2", None).unwrap_err().kind(),
        ErrorKind::ForbiddenAttribute
    );
    assert_untracked(&store);

    store.insert(record(json!({"i": 10, "i//2": 5, "i**2": 100}))).unwrap();
    assert_untracked(&store);

    // The value is still written, just never indexed
    let f = store.fields();
    store.update(json!({"i**2": 21.1}), f.attr("i").eq(1)).unwrap();
    assert_untracked(&store);
    let hit = store.query_one(json!({"i": 1})).unwrap();
    assert_eq!(attribute(hit, "i**2"), json!(21.1));
}

/// Strict admission turns an excluded attribute into an error.
#[test]
fn test_excluded_attribute_strict() {
    let mut store = squares(true);
    let err = store
        .insert(record(json!({"i": 1, "i**2": 1})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
    assert!(store.is_empty());

    store.insert(record(json!({"i": 1}))).unwrap();
    let err = store.update(json!({"i**2": 1}), json!({"i": 1})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
}

// =============================================================================
// Reserved Name
// =============================================================================

/// `_position` can be queried but never stored or configured.
#[test]
fn test_position_is_reserved() {
    let mut store = Store::builder().strict_admission(false).build().unwrap();
    let err = store.insert(record(json!({"_position": 0}))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);

    let err = store.declare_attribute("_position", Some(json!(0).into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);

    let err = Store::builder().excluded_attributes(["_position"]).build().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_from_json() {
    let config = StoreConfig::from_json_str(
        r#"{
            "allowed_attributes": ["first", "last"],
            "return_mode": "auto",
            "allow_multiple_edit": true,
            "strict_admission": false,
            "default_value": "unknown"
        }"#,
    )
    .unwrap();
    let mut store = Store::with_config(config).unwrap();
    store
        .insert_many([
            record(json!({"first": "John", "last": "Lennon", "born": 1940})),
            record(json!({"first": "George"})),
        ])
        .unwrap();

    assert_eq!(store.return_mode(), ReturnMode::Auto);
    assert!(store.allow_multiple_edit());
    assert_eq!(store.attributes(), vec!["first", "last"]);
    assert_eq!(attribute(store.get(1).unwrap(), "last"), json!("unknown"));
    assert_eq!(store.query(json!({"last": "unknown"})).unwrap().len(), 1);
}

#[test]
fn test_config_rejects_conflicts() {
    let err = StoreConfig::from_json_str(
        r#"{"allowed_attributes": ["a"], "excluded_attributes": ["a"]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    assert!(StoreConfig::from_json_str(r#"{"return_mode": "sometimes"}"#).is_err());
}

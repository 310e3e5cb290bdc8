//! The store: records, indexes and the mutation API behind one handle
//!
//! Every mutation made through [`Store`] keeps the indexes current. The
//! generation only advances on a full [`reindex`](Store::reindex), which is
//! how changes made behind the store's back (shared handles, `get_mut`)
//! become visible, and how queries built before those changes are retired.
//!
//! # Mutation flow
//!
//! 1. Check every attribute against the admission policy
//! 2. Resolve the selector and enforce the match-count policy
//! 3. Declare attributes seen for the first time, backfilling defaults
//! 4. Apply the change to the records
//! 5. Update the affected indexes

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ErrorKind, StoreError, StoreResult};
use crate::executor::QueryEvaluator;
use crate::index::{
    AttributePolicy, DefaultValue, Generation, IndexManager, FILTER_ATTRIBUTE, POSITION_ATTRIBUTE,
};
use crate::observability::{Event, MetricsSnapshot, StoreMetrics};
use crate::query::{Fields, Selector, Stamp};
use crate::storage::{Position, Record, RecordStore, StoredRecord};

use super::config::{ReturnMode, StoreConfig};
use super::matches::Matches;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory record store with per-attribute indexes.
///
/// ```ignore
/// let mut store = Store::new();
/// store.insert(record)?;
/// let f = store.fields();
/// let hits = store.query_list(f.attr("born").le(1940))?;
/// ```
#[derive(Debug)]
pub struct Store {
    /// Distinguishes this store's query stamps from any other store's
    id: u64,
    records: RecordStore,
    indices: IndexManager,
    policy: AttributePolicy,
    default: DefaultValue,
    return_mode: ReturnMode,
    allow_multiple_edit: bool,
    strict_admission: bool,
    metrics: StoreMetrics,
}

impl Store {
    /// Empty store with the default configuration
    pub fn new() -> Self {
        Self::from_parts(StoreConfig::default(), None)
    }

    /// Empty store with a validated configuration
    pub fn with_config(config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, None))
    }

    /// Builder for settings that have no JSON form
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Default-configured store holding `records`
    pub fn from_records<R>(records: impl IntoIterator<Item = R>) -> StoreResult<Self>
    where
        R: Into<StoredRecord>,
    {
        let mut store = Self::new();
        store.insert_many(records)?;
        Ok(store)
    }

    fn from_parts(config: StoreConfig, default: Option<DefaultValue>) -> Self {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        let policy = config.policy();
        let default = default.unwrap_or_else(|| DefaultValue::from(config.default_value));
        debug!(target: "attrdb::store", event = %Event::StoreCreated, store = id);
        Self {
            id,
            records: RecordStore::new(),
            indices: IndexManager::new(),
            policy,
            default,
            return_mode: config.return_mode,
            allow_multiple_edit: config.allow_multiple_edit,
            strict_admission: config.strict_admission,
            metrics: StoreMetrics::new(),
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn return_mode(&self) -> ReturnMode {
        self.return_mode
    }

    pub fn set_return_mode(&mut self, mode: ReturnMode) {
        self.return_mode = mode;
    }

    pub fn allow_multiple_edit(&self) -> bool {
        self.allow_multiple_edit
    }

    pub fn set_allow_multiple_edit(&mut self, allow: bool) {
        self.allow_multiple_edit = allow;
    }

    /// Current generation
    pub fn generation(&self) -> Generation {
        self.indices.generation()
    }

    /// Tracked attribute names, sorted
    pub fn attributes(&self) -> Vec<&str> {
        self.indices.attributes().collect()
    }

    /// Counter snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Inserts a record and returns its position.
    ///
    /// Attributes the store has not seen yet are declared first, backfilling
    /// the store default into existing records in position order; then the
    /// record itself receives the default for every tracked attribute it
    /// lacks.
    pub fn insert(&mut self, record: impl Into<StoredRecord>) -> StoreResult<Position> {
        let mut record = record.into();
        let admitted = self.admit_names(&record.attribute_names())?;

        let undeclared: Vec<String> = admitted
            .into_iter()
            .filter(|name| !self.indices.contains(name))
            .collect();
        for name in &undeclared {
            self.indices.declare_attribute(
                name,
                Some(&mut self.default),
                &mut self.records,
                &mut self.policy,
            )?;
        }

        let missing: Vec<String> = self
            .indices
            .attributes()
            .filter(|name| !record.has(name))
            .map(str::to_string)
            .collect();
        for name in &missing {
            record.set(name, self.default.produce());
        }

        let position = self.records.insert(record);
        self.indices.on_insert(position, self.records.get(position)?);
        self.metrics.increment_inserted();

        debug!(
            target: "attrdb::store",
            event = %Event::RecordInserted,
            position,
            declared = undeclared.len(),
            backfilled = missing.len(),
        );
        Ok(position)
    }

    /// Inserts a caller-owned record by reference.
    ///
    /// Backfilled defaults and updates are written through the handle, so
    /// the caller observes them. Changes the caller makes directly are not
    /// seen by the indexes until the next [`reindex`](Self::reindex).
    pub fn insert_shared<T: Record + 'static>(
        &mut self,
        handle: &Rc<RefCell<T>>,
    ) -> StoreResult<Position> {
        self.insert(StoredRecord::shared(handle.clone()))
    }

    /// Inserts records in order. Stops at the first failure; records before
    /// it stay inserted.
    pub fn insert_many<R>(&mut self, records: impl IntoIterator<Item = R>) -> StoreResult<Vec<Position>>
    where
        R: Into<StoredRecord>,
    {
        records
            .into_iter()
            .map(|record| self.insert(record))
            .collect()
    }

    /// Admitted subset of `names`, or the first policy violation when
    /// admission is strict
    fn admit_names(&self, names: &[String]) -> StoreResult<Vec<String>> {
        let mut admitted = Vec::with_capacity(names.len());
        for name in names {
            if name == POSITION_ATTRIBUTE {
                return Err(StoreError::forbidden(name.as_str(), "reserved for record positions"));
            }
            match self.policy.check_implicit(name) {
                Ok(()) => admitted.push(name.clone()),
                Err(err) if self.strict_admission => return Err(err),
                Err(_) => {}
            }
        }
        Ok(admitted)
    }

    // ------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------

    /// Starts tracking `name`, backfilling `default` where it is missing.
    ///
    /// Without a default, every live record must already hold the
    /// attribute. Returns the number of records backfilled.
    pub fn declare_attribute(
        &mut self,
        name: &str,
        mut default: Option<DefaultValue>,
    ) -> StoreResult<usize> {
        self.indices
            .declare_attribute(name, default.as_mut(), &mut self.records, &mut self.policy)
    }

    /// Rebuilds indexes from the records.
    ///
    /// `None` rebuilds everything and advances the generation; a subset
    /// rebuilds only the named indexes and keeps outstanding queries valid.
    pub fn reindex(&mut self, subset: Option<&[&str]>) -> StoreResult<()> {
        self.indices.reindex(&self.records, subset, &self.policy)?;
        if subset.is_none() {
            self.metrics.increment_reindexes();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Query builder bound to the current generation
    pub fn fields(&self) -> Fields {
        Fields::new(
            Stamp {
                store_id: self.id,
                generation: self.indices.generation(),
            },
            self.indices.contains(FILTER_ATTRIBUTE),
        )
    }

    /// Matching positions, ascending
    pub fn query_positions(&self, selector: impl Into<Selector>) -> StoreResult<BTreeSet<Position>> {
        let query = selector.into().into_query(&self.indices)?;
        let evaluator = QueryEvaluator::new(&self.indices, &self.records, self.id);
        match evaluator.evaluate(&query) {
            Ok(positions) => {
                self.metrics.increment_queries_executed();
                Ok(positions)
            }
            Err(err) => {
                if err.kind() == ErrorKind::StaleQuery {
                    self.metrics.increment_queries_rejected();
                }
                Err(err)
            }
        }
    }

    /// Matching records, shaped by the store's [`ReturnMode`]
    pub fn query(&self, selector: impl Into<Selector>) -> StoreResult<Matches<'_>> {
        let records = self.query_list(selector)?;
        match self.return_mode {
            ReturnMode::List => Ok(Matches::Many(records)),
            ReturnMode::Single => exactly_one(records).map(Matches::One),
            ReturnMode::Auto if records.len() == 1 => exactly_one(records).map(Matches::One),
            ReturnMode::Auto => Ok(Matches::Many(records)),
        }
    }

    /// Matching records, ascending by position
    pub fn query_list(&self, selector: impl Into<Selector>) -> StoreResult<Vec<&StoredRecord>> {
        self.query_positions(selector)?
            .into_iter()
            .map(|position| self.records.get(position))
            .collect()
    }

    /// The single matching record; `AmbiguousMatch` otherwise
    pub fn query_one(&self, selector: impl Into<Selector>) -> StoreResult<&StoredRecord> {
        exactly_one(self.query_list(selector)?)
    }

    /// Returns true if any live record matches
    pub fn contains(&self, selector: impl Into<Selector>) -> StoreResult<bool> {
        Ok(!self.query_positions(selector)?.is_empty())
    }

    // ------------------------------------------------------------------
    // Update / remove
    // ------------------------------------------------------------------

    /// Applies `changes` (a JSON object) to the matching records and returns
    /// how many were changed.
    ///
    /// At least one record must match; more than one only when multiple
    /// edits are allowed.
    pub fn update(&mut self, changes: Value, selector: impl Into<Selector>) -> StoreResult<usize> {
        let Value::Object(changes) = changes else {
            return Err(StoreError::invalid_query(format!(
                "changes must be a mapping, got {changes}"
            )));
        };
        let names: Vec<String> = changes.keys().cloned().collect();
        let admitted = self.admit_names(&names)?;
        let positions = self.edit_targets(selector)?;

        let undeclared: Vec<String> = admitted
            .iter()
            .filter(|name| !self.indices.contains(name))
            .cloned()
            .collect();
        for name in &undeclared {
            self.indices.declare_attribute(
                name,
                Some(&mut self.default),
                &mut self.records,
                &mut self.policy,
            )?;
        }

        for &position in &positions {
            let record = self.records.get_mut(position)?;
            for (name, value) in &changes {
                record.set(name, value.clone());
            }
            self.indices.on_update(position, &*record, &admitted);
        }

        self.metrics.add_updated(positions.len() as u64);
        debug!(
            target: "attrdb::store",
            event = %Event::RecordUpdated,
            records = positions.len(),
            attributes = ?names,
        );
        Ok(positions.len())
    }

    /// Removes the matching records and returns how many were removed.
    ///
    /// Same match-count policy as [`update`](Self::update). Positions are
    /// tombstoned, never reused.
    pub fn remove(&mut self, selector: impl Into<Selector>) -> StoreResult<usize> {
        let positions = self.edit_targets(selector)?;
        for &position in &positions {
            self.indices.on_remove(position);
            self.records.remove(position)?;
        }

        self.metrics.add_removed(positions.len() as u64);
        debug!(
            target: "attrdb::store",
            event = %Event::RecordRemoved,
            positions = ?positions,
        );
        Ok(positions.len())
    }

    /// Removes the record at `position`
    pub fn remove_at(&mut self, position: Position) -> StoreResult<StoredRecord> {
        let record = self.records.remove(position)?;
        self.indices.on_remove(position);
        self.metrics.add_removed(1);
        debug!(target: "attrdb::store", event = %Event::RecordRemoved, position);
        Ok(record)
    }

    fn edit_targets(&self, selector: impl Into<Selector>) -> StoreResult<BTreeSet<Position>> {
        let query = selector.into().into_query(&self.indices)?;
        if query.is_empty() {
            return Err(StoreError::invalid_query("an edit needs a non-empty selector"));
        }
        let positions = self.query_positions(query)?;
        match positions.len() {
            0 => Err(StoreError::AmbiguousMatch { found: 0 }),
            1 => Ok(positions),
            found if !self.allow_multiple_edit => Err(StoreError::AmbiguousMatch { found }),
            _ => Ok(positions),
        }
    }

    // ------------------------------------------------------------------
    // Container access
    // ------------------------------------------------------------------

    /// Live record at `position`
    pub fn get(&self, position: Position) -> StoreResult<&StoredRecord> {
        self.records.get(position)
    }

    /// Mutable access to a live record. Indexes are not updated; call
    /// [`reindex`](Self::reindex) afterwards.
    pub fn get_mut(&mut self, position: Position) -> StoreResult<&mut StoredRecord> {
        self.records.get_mut(position)
    }

    /// Live records, ascending by position
    pub fn iter(&self) -> impl Iterator<Item = &StoredRecord> + '_ {
        self.records.iter().map(|(_, record)| record)
    }

    /// Live positions, ascending
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.records.live_positions()
    }

    /// Live records with their positions, ascending
    pub fn iter_with_positions(&self) -> impl Iterator<Item = (Position, &StoredRecord)> + '_ {
        self.records.iter()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn exactly_one(records: Vec<&StoredRecord>) -> StoreResult<&StoredRecord> {
    match records.as_slice() {
        [record] => Ok(*record),
        _ => Err(StoreError::AmbiguousMatch {
            found: records.len(),
        }),
    }
}

/// Builds a [`Store`] from a [`StoreConfig`] plus a callable default.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    config: StoreConfig,
    default: Option<DefaultValue>,
}

impl StoreBuilder {
    /// Replaces the whole configuration
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn allowed_attributes(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.allowed_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn excluded_attributes(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.excluded_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn return_mode(mut self, mode: ReturnMode) -> Self {
        self.config.return_mode = mode;
        self
    }

    pub fn allow_multiple_edit(mut self, allow: bool) -> Self {
        self.config.allow_multiple_edit = allow;
        self
    }

    pub fn strict_admission(mut self, strict: bool) -> Self {
        self.config.strict_admission = strict;
        self
    }

    /// Constant default, cloned into each record that lacks an attribute
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.config.default_value = value.into();
        self.default = None;
        self
    }

    /// Callable default, invoked once per missing occurrence
    pub fn default_factory(mut self, factory: impl FnMut() -> Value + 'static) -> Self {
        self.default = Some(DefaultValue::factory(factory));
        self
    }

    pub fn build(self) -> Result<Store, ConfigError> {
        self.config.validate()?;
        Ok(Store::from_parts(self.config, self.default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn beatles() -> Store {
        Store::from_records(
            [
                json!({"first": "John", "last": "Lennon", "born": 1940, "role": "guitar"}),
                json!({"first": "Paul", "last": "McCartney", "born": 1942, "role": "bass"}),
                json!({"first": "George", "last": "Harrison", "born": 1943, "role": "guitar"}),
                json!({"first": "Ringo", "last": "Starr", "born": 1940, "role": "drums"}),
                json!({"first": "George", "last": "Martin", "born": 1926, "role": "producer"}),
            ]
            .into_iter()
            .map(|value| value.as_object().cloned().unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_store_ids_are_distinct() {
        assert_ne!(Store::new().id, Store::new().id);
    }

    #[test]
    fn test_single_mode_requires_one_match() {
        let store = beatles();
        let f = store.fields();

        let ringo = store.query(f.attr("first").eq("Ringo")).unwrap();
        assert_eq!(ringo.one().unwrap().get("last").as_deref(), Some(&json!("Starr")));

        let err = store.query(f.attr("first").eq("George")).unwrap_err();
        assert_eq!(err, StoreError::AmbiguousMatch { found: 2 });

        let err = store.query(f.attr("first").eq("Pete")).unwrap_err();
        assert_eq!(err, StoreError::AmbiguousMatch { found: 0 });
    }

    #[test]
    fn test_list_and_auto_modes() {
        let mut store = beatles();
        let f = store.fields();

        store.set_return_mode(ReturnMode::List);
        let hits = store.query(f.attr("first").eq("Pete")).unwrap();
        assert!(matches!(hits, Matches::Many(ref records) if records.is_empty()));

        store.set_return_mode(ReturnMode::Auto);
        assert!(matches!(store.query(f.attr("first").eq("Ringo")).unwrap(), Matches::One(_)));
        assert_eq!(store.query(f.attr("first").eq("George")).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_rejects_reserved_name() {
        let mut store = Store::new();
        let record = json!({"_position": 3}).as_object().cloned().unwrap();
        let err = store.insert(record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_reindexes_changed_attributes() {
        let mut store = beatles();
        store.update(json!({"role": "vocals"}), json!({"first": "John"})).unwrap();

        let f = store.fields();
        assert_eq!(store.query_positions(f.attr("role").eq("vocals")).unwrap(), BTreeSet::from([0]));
        assert_eq!(store.query_positions(f.attr("role").eq("guitar")).unwrap(), BTreeSet::from([2]));
    }

    #[test]
    fn test_update_rejects_non_mapping_changes() {
        let mut store = beatles();
        let err = store.update(json!(["role"]), json!({"first": "John"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuerySyntax);
    }

    #[test]
    fn test_edit_needs_selector() {
        let mut store = beatles();
        let err = store.remove(json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuerySyntax);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_remove_at() {
        let mut store = beatles();
        store.remove_at(1).unwrap();
        assert_eq!(store.get(1).unwrap_err(), StoreError::NotFound { position: 1 });
        assert_eq!(store.positions().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
        assert_eq!(store.metrics().records_removed, 1);
    }

    #[test]
    fn test_builder_callable_default() {
        let mut counter = 0;
        let mut store = Store::builder()
            .default_factory(move || {
                counter += 1;
                json!(counter)
            })
            .build()
            .unwrap();

        store.insert(json!({"a": 1}).as_object().cloned().unwrap()).unwrap();
        store.insert(json!({"b": 2}).as_object().cloned().unwrap()).unwrap();

        assert_eq!(store.get(0).unwrap().get("b").as_deref(), Some(&json!(1)));
        assert_eq!(store.get(1).unwrap().get("a").as_deref(), Some(&json!(2)));
    }

    #[test]
    fn test_metrics_count_queries() {
        let mut store = beatles();
        let f = store.fields();
        store.query_positions(f.attr("born").lt(1941)).unwrap();
        store.reindex(None).unwrap();
        assert!(store.query_positions(f.attr("born").lt(1941)).is_err());

        let snapshot = store.metrics();
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.queries_rejected, 1);
        assert_eq!(snapshot.reindexes, 1);
        assert_eq!(snapshot.records_inserted, 5);
    }
}

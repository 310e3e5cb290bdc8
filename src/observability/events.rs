//! Observable store events
//!
//! Events are explicit and typed. Each one is attached to the matching
//! `tracing` event as its `event` field.

use std::fmt;

/// Observable events in attrdb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Lifecycle
    /// Store constructed
    StoreCreated,
    /// Configuration file loaded
    ConfigLoaded,

    // Mutations
    /// Record appended
    RecordInserted,
    /// Record tombstoned
    RecordRemoved,
    /// Record changed through the store
    RecordUpdated,

    // Indexing
    /// New attribute tracked, defaults backfilled
    AttributeDeclared,
    /// Every index rebuilt, generation advanced
    ReindexComplete,
    /// Some indexes rebuilt, generation unchanged
    PartialReindex,

    // Queries
    /// Query resolved to a position set
    QueryEvaluated,
    /// Query built under an older generation was refused
    StaleQueryRejected,
}

impl Event {
    /// Stable upper-case event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreCreated => "STORE_CREATED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RecordInserted => "RECORD_INSERTED",
            Event::RecordRemoved => "RECORD_REMOVED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::AttributeDeclared => "ATTRIBUTE_DECLARED",
            Event::ReindexComplete => "REINDEX_COMPLETE",
            Event::PartialReindex => "PARTIAL_REINDEX",
            Event::QueryEvaluated => "QUERY_EVALUATED",
            Event::StaleQueryRejected => "STALE_QUERY_REJECTED",
        }
    }

    /// Returns true for events that signal misuse rather than progress
    pub fn is_rejection(&self) -> bool {
        matches!(self, Event::StaleQueryRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Store counters
//!
//! - Counters only, monotonic
//! - Reset only when the store is dropped
//! - Updated through `&self`, so read paths can count too

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one store
#[derive(Debug, Default)]
pub struct StoreMetrics {
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    records_inserted: AtomicU64,
    records_removed: AtomicU64,
    records_updated: AtomicU64,
    reindexes: AtomicU64,
}

impl StoreMetrics {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_inserted(&self) {
        self.records_inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_removed(&self, count: u64) {
        self.records_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_updated(&self, count: u64) {
        self.records_updated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_reindexes(&self) {
        self.reindexes.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            records_inserted: self.records_inserted.load(Ordering::Relaxed),
            records_removed: self.records_removed.load(Ordering::Relaxed),
            records_updated: self.records_updated.load(Ordering::Relaxed),
            reindexes: self.reindexes.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`StoreMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub records_inserted: u64,
    pub records_removed: u64,
    pub records_updated: u64,
    pub reindexes: u64,
}

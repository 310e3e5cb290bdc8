//! Observability for attrdb
//!
//! Logging goes through `tracing`; this module supplies the typed event
//! names attached to every log line and the per-store counters.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on store state
//! 3. No background threads
//!
//! # Usage
//!
//! ```ignore
//! use tracing::debug;
//! use attrdb::observability::Event;
//!
//! debug!(target: "attrdb::store", event = %Event::RecordInserted, position = 3);
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{MetricsSnapshot, StoreMetrics};

//! CLI command implementations
//!
//! Both commands build a throwaway in-memory store; nothing is persisted.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::api::{Matches, ReturnMode, Store, StoreConfig};
use crate::executor::RecordFilter;
use crate::observability::MetricsSnapshot;
use crate::query::{CompareOp, Query};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_records, write_lines};
use super::workload::{generate_groups, generate_records};

/// Parse arguments, install logging and run the command
pub fn run() -> CliResult<()> {
    init_logging();
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// JSON logs on stderr, filtered by `RUST_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second install (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query {
            input,
            selector,
            config,
            list,
        } => {
            let matches = query(&input, &selector, config.as_deref(), list)?;
            write_lines(&matches)
        }
        Command::Bench {
            records,
            queries,
            seed,
        } => {
            let report = bench(records, queries, seed)?;
            let value = serde_json::to_value(&report)?;
            write_lines([&value])
        }
    }
}

/// Loads `input` into a store and returns the records matching `selector`.
///
/// With `list` every match is returned; otherwise the configured return mode
/// applies (exactly one match by default).
pub fn query(input: &Path, selector: &str, config: Option<&Path>, list: bool) -> CliResult<Vec<Value>> {
    let config = match config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    let mut store = Store::with_config(config)?;
    if list {
        store.set_return_mode(ReturnMode::List);
    }

    store.insert_many(read_records(input)?)?;

    let selector: Value = serde_json::from_str(selector)
        .map_err(|e| CliError::input_error(1, format!("--where: {e}")))?;
    Ok(match store.query(selector)? {
        Matches::One(record) => vec![record.to_value()],
        Matches::Many(records) => records.iter().map(|record| record.to_value()).collect(),
    })
}

/// Timings of one bench run, in milliseconds
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub records: usize,
    pub queries: usize,
    pub insert_ms: f64,
    pub indexed_eq_ms: f64,
    pub scan_eq_ms: f64,
    pub indexed_range_ms: f64,
    pub scan_range_ms: f64,
    /// Records matched by the equality queries, identical for both paths
    pub eq_matches: usize,
    pub range_matches: usize,
    pub metrics: MetricsSnapshot,
}

/// Generates `records` random records and times `queries` equality and range
/// queries through the indexes and through a linear scan.
///
/// Fails if the two paths ever disagree.
pub fn bench(records: usize, queries: usize, seed: u64) -> CliResult<BenchReport> {
    let data = generate_records(records, seed);
    let groups = generate_groups(queries, seed);

    let started = Instant::now();
    let store = Store::from_records(data)?;
    let insert_ms = elapsed_ms(started);

    let f = store.fields();
    let eq_queries: Vec<Query> = groups.iter().map(|&group| f.attr("group").eq(group)).collect();
    let range_queries: Vec<Query> = groups
        .iter()
        .map(|&group| f.attr("score").lt(group as f64 * 10.0))
        .collect();

    let (indexed_eq_ms, eq_matches) = time_indexed(&store, &eq_queries)?;
    let (scan_eq_ms, scanned_eq) = time_scan(&store, &eq_queries);
    let (indexed_range_ms, range_matches) = time_indexed(&store, &range_queries)?;
    let (scan_range_ms, scanned_range) = time_scan(&store, &range_queries);

    if eq_matches != scanned_eq || range_matches != scanned_range {
        return Err(CliError::io_error(format!(
            "index and scan disagree: eq {eq_matches} vs {scanned_eq}, range {range_matches} vs {scanned_range}"
        )));
    }

    Ok(BenchReport {
        records,
        queries,
        insert_ms,
        indexed_eq_ms,
        scan_eq_ms,
        indexed_range_ms,
        scan_range_ms,
        eq_matches,
        range_matches,
        metrics: store.metrics(),
    })
}

fn time_indexed(store: &Store, queries: &[Query]) -> CliResult<(f64, usize)> {
    let started = Instant::now();
    let mut matched = 0;
    for query in queries {
        matched += store.query_positions(query.clone())?.len();
    }
    Ok((elapsed_ms(started), matched))
}

fn time_scan(store: &Store, queries: &[Query]) -> (f64, usize) {
    let started = Instant::now();
    let mut matched = 0;
    for query in queries {
        matched += store
            .iter_with_positions()
            .filter(|(position, record)| RecordFilter::matches(*record, *position, query.node()))
            .count();
    }
    (elapsed_ms(started), matched)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

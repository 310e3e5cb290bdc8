//! CLI module for attrdb
//!
//! Provides command-line interface for:
//! - query: load JSON-lines records and run one mapping query
//! - bench: compare indexed queries against a linear scan

mod args;
mod commands;
mod errors;
mod io;
mod workload;

pub use args::{Cli, Command};
pub use commands::{bench, query, run, run_command, BenchReport};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_records, read_records, write_lines};
pub use workload::{generate_groups, generate_records, GROUPS};

//! CLI argument definitions using clap
//!
//! Commands:
//! - attrdb query --input <records.jsonl> --where <json> [--config <path>] [--list]
//! - attrdb bench [--records N] [--queries M] [--seed S]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// attrdb - an in-memory record store with per-attribute indexes
#[derive(Parser, Debug)]
#[command(name = "attrdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load JSON-lines records, run one mapping query, print the matches
    Query {
        /// File with one JSON object per line
        #[arg(long)]
        input: PathBuf,

        /// JSON object; every entry must match
        #[arg(long = "where")]
        selector: String,

        /// Path to store configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print every match instead of requiring exactly one
        #[arg(long)]
        list: bool,
    },

    /// Time indexed queries against a linear scan on random records
    Bench {
        /// Number of records to generate
        #[arg(long, default_value_t = 10_000)]
        records: usize,

        /// Number of queries per measurement
        #[arg(long, default_value_t = 1_000)]
        queries: usize,

        /// Seed for the record generator
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

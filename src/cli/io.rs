//! JSON I/O handling for CLI
//!
//! - Input: one JSON object per line, blank lines skipped
//! - Output: one JSON value per line on stdout
//! - UTF-8 only

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde_json::{Map, Value};

use super::errors::{CliError, CliResult};

/// Reads JSON-lines records from `path`
pub fn read_records(path: &Path) -> CliResult<Vec<Map<String, Value>>> {
    let file = File::open(path)
        .map_err(|e| CliError::io_error(format!("{}: {}", path.display(), e)))?;
    parse_records(BufReader::new(file))
}

/// Parses JSON-lines records from any reader
pub fn parse_records(reader: impl BufRead) -> CliResult<Vec<Map<String, Value>>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line).map_err(|e| CliError::input_error(index + 1, e))? {
            Value::Object(map) => records.push(map),
            other => {
                return Err(CliError::input_error(
                    index + 1,
                    format!("expected a JSON object, got {other}"),
                ))
            }
        }
    }
    Ok(records)
}

/// Writes one JSON value per line to stdout
pub fn write_lines<'a>(values: impl IntoIterator<Item = &'a Value>) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for value in values {
        serde_json::to_writer(&mut out, value)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

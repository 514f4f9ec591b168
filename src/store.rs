//! Flat-file persistence: one `key->value` line per entry.
//!
//! Loading splits on the first `->`, so values may contain the separator.
//! Lines without a separator, or whose key fails [`validate_key`], are
//! skipped and counted. Neither direction is transactional: a failure
//! midway leaves whatever was already written or inserted.

use crate::error::StoreError;
use crate::table::Table;
use crate::validate::validate_key;
use log::{info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const SEPARATOR: &str = "->";

/// Outcome of [`load`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Keys that were not in the table before their line was applied.
    pub loaded: usize,
    /// Lines that overwrote an existing value, including repeats within the file.
    pub updated: usize,
    pub skipped: usize,
}

/// Split a line into key and value at the first separator.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(SEPARATOR)
}

/// Whether the pair survives a save/load cycle unchanged: the key must pass
/// [`validate_key`] and the value must not contain a line break (`lines()`
/// strips a trailing `\r` on reading).
fn representable(key: &str, value: &str) -> bool {
    validate_key(key).is_ok() && !value.contains(['\n', '\r'])
}

/// Write every live entry of `table` to `out`, returning how many were written.
pub fn write_entries<W: Write>(table: &Table, mut out: W) -> io::Result<usize> {
    let mut written = 0;
    for (key, value) in table {
        writeln!(out, "{key}{SEPARATOR}{value}")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Parse `key->value` lines, returning the valid pairs and the skipped-line count.
pub fn read_entries<R: BufRead>(input: R) -> io::Result<(Vec<(String, String)>, usize)> {
    let mut pairs = Vec::new();
    let mut skipped = 0;
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Some((key, value)) if validate_key(key).is_ok() => {
                pairs.push((key.to_string(), value.to_string()));
            }
            Some((key, _)) => {
                warn!("line {}: skipping invalid key {:?}", lineno + 1, key);
                skipped += 1;
            }
            None => {
                warn!("line {}: no `{}` separator, skipping", lineno + 1, SEPARATOR);
                skipped += 1;
            }
        }
    }
    Ok((pairs, skipped))
}

/// Save `table` to `path`, truncating any existing file.
///
/// Entries the line format cannot carry are reported before the file is
/// touched.
pub fn save(table: &Table, path: impl AsRef<Path>) -> Result<usize, StoreError> {
    let path = path.as_ref();
    if let Some((key, _)) = table.iter().find(|(k, v)| !representable(k, v)) {
        return Err(StoreError::Unrepresentable {
            key: key.to_string(),
        });
    }
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let written = write_entries(table, BufWriter::new(file)).map_err(io_err)?;
    info!("saved {} entries to {}", written, path.display());
    Ok(written)
}

/// Load entries from `path` into `table` (upserting), growing the table at
/// most once up front for the whole batch.
pub fn load(table: &mut Table, path: impl AsRef<Path>) -> Result<LoadSummary, StoreError> {
    let path = path.as_ref();
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let (pairs, skipped) = read_entries(BufReader::new(file)).map_err(io_err)?;

    let fresh: HashSet<&str> = pairs
        .iter()
        .map(|(key, _)| key.as_str())
        .filter(|key| !table.contains_key(key))
        .collect();
    table.reserve(fresh.len())?;

    let mut summary = LoadSummary {
        skipped,
        ..LoadSummary::default()
    };
    for (key, value) in pairs {
        match table.insert(key, value)? {
            None => summary.loaded += 1,
            Some(_) => summary.updated += 1,
        }
    }
    info!(
        "loaded {} entries from {} ({} updated, {} lines skipped)",
        summary.loaded,
        path.display(),
        summary.updated,
        summary.skipped
    );
    Ok(summary)
}

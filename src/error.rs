//! Error types for the table, the flat-file store and the command driver.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by [`Table`](crate::Table) construction, growth and key validation.
///
/// A missing key is not an error: `remove` and `retrieve` return `None`.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("capacity must be greater than 1, got {0}")]
    InvalidCapacity(usize),
    #[error("maximum load factor must be in (0, 1), got {0}")]
    InvalidLoadFactor(f64),
    #[error("invalid key {0:?}: keys must be non-empty and alphanumeric")]
    InvalidKey(String),
    /// The slot array for `requested` slots could not be reserved. The table
    /// keeps its previous slots, capacity and count.
    #[error("could not allocate a slot array of {requested} slots")]
    AllocationFailure { requested: usize },
    /// Growth to `requested` slots would pass the configured maximum. The
    /// table keeps its previous slots, capacity and count.
    #[error("table cannot grow to {requested} slots (limit {limit})")]
    CapacityLimit { requested: usize, limit: usize },
}

/// Failures raised by [`store::save`](crate::store::save) and [`store::load`](crate::store::load).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("entry {key:?} cannot be written as a `key->value` line")]
    Unrepresentable { key: String },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures raised while parsing or executing a driver command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    UnknownCommand(String),
    #[error("`{command}` needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Output(#[from] io::Error),
}

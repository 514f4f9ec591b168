//! dh-table: an open-addressing hash table from `String` keys to `String`
//! values, resolved by double hashing over prime capacities, with a flat-file
//! store and a small command driver.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the interesting part (probing, growth, occupancy
//!   invariants) in one small structural type and push validation, I/O and
//!   user interaction to thin layers around it.
//! - Layers:
//!   - `hasher`: pure functions. The primary hash is a base-53 polynomial
//!     modulo 1_000_000_007; the secondary hash `1 + h mod (capacity - 1)`
//!     gives the probe step.
//!   - `Table`: a `Vec` of slots (empty, tombstone, occupied) plus counts.
//!     Insert, remove, retrieve and resize live here.
//!   - `store`: `key->value` line format for save/load.
//!   - `command::Session`: parses one text command and applies it; the
//!     `dh-table` binary feeds it stdin.
//!
//! Constraints
//! - Single-threaded: no internal locking. Wrap a `Table` in a mutex for
//!   shared use.
//! - Capacity is always prime, so each key's probe sequence visits every
//!   slot within `capacity` attempts.
//! - Unique keys: insert is an upsert.
//! - Load factor stays at or below the configured maximum (default 0.7)
//!   after every successful insert.
//!
//! Removal and tombstones
//! - A removed slot becomes a tombstone. Lookups probe past it; inserts of
//!   new keys reuse the first one on their sequence. Tombstones are dropped
//!   only when the table is rebuilt (grow or explicit `resize`).
//!
//! Hasher and rehashing invariants
//! - Each entry stores its primary hash; rebuilding places entries by the
//!   stored hash without rereading key bytes.
//! - Growth allocates the new slot array with fallible reservation before
//!   moving anything. If allocation fails the table is left exactly as it
//!   was and `TableError::AllocationFailure` is returned.
//!
//! Notes and non-goals
//! - Text keys and values only; no generic parameters.
//! - Hash quality is not cryptographic.
//! - Key validation (non-empty, ASCII alphanumeric) happens at the
//!   boundary in `validate`; `Table` accepts any key.
//! - Save and load are not transactional.

pub mod command;
pub mod config;
pub mod error;
pub mod hasher;
pub mod primes;
pub mod store;
pub mod table;
mod table_proptest;
pub mod validate;

// Public surface
pub use config::TableConfig;
pub use error::{CommandError, StoreError, TableError};
pub use store::LoadSummary;
pub use table::{Stats, Table};
pub use validate::validate_key;

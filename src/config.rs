//! Table configuration.

use crate::error::TableError;

/// Initial slot count used when none is given.
pub const DEFAULT_CAPACITY: usize = 53;
/// Load factor above which the table grows.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.7;

/// Construction parameters for a [`Table`](crate::Table).
///
/// The initial capacity is rounded up to the next prime when the table is
/// built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub initial_capacity: usize,
    pub max_load_factor: f64,
    /// Upper bound on the slot count; growth past it fails with
    /// `CapacityLimit` and leaves the table unchanged.
    pub max_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            max_capacity: usize::MAX,
        }
    }
}

impl TableConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_load_factor(mut self, load_factor: f64) -> Self {
        self.max_load_factor = load_factor;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Capacity must exceed 1 (the secondary hash divides by `capacity - 1`)
    /// and the load factor must lie strictly between 0 and 1 so that a free
    /// slot always exists before an insert.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.initial_capacity <= 1 {
            return Err(TableError::InvalidCapacity(self.initial_capacity));
        }
        if self.initial_capacity > self.max_capacity {
            return Err(TableError::CapacityLimit {
                requested: self.initial_capacity,
                limit: self.max_capacity,
            });
        }
        let lf = self.max_load_factor;
        if !(lf > 0.0 && lf < 1.0) {
            return Err(TableError::InvalidLoadFactor(lf));
        }
        Ok(())
    }
}

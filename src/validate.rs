//! Key validation applied at the boundary (command driver, store loader).
//! [`Table`](crate::Table) itself accepts any key.

use crate::error::TableError;

/// A key is valid when it is non-empty and entirely ASCII alphanumeric.
pub fn validate_key(key: &str) -> Result<(), TableError> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(TableError::InvalidKey(key.to_string()))
    }
}

//! Hasher: the two hash functions behind the double-hashing probe sequence.
//!
//! The primary hash is a polynomial rolling hash over the key's bytes with
//! base 53 and modulus 1_000_000_007, where byte `b` at position `i`
//! contributes `(b - b'a' + 1) * 53^i`. The formula is designed for lowercase
//! letters; digits, uppercase letters and other bytes contribute zero or
//! negative terms. The sum is reduced with a Euclidean remainder, so the
//! result always lies in `0..1_000_000_007` and is identical on every
//! platform and run. Keys are only validated as alphanumeric upstream.
//!
//! The secondary hash `1 + primary mod (buckets - 1)` is never zero, so with a
//! prime bucket count every probe step is coprime with the capacity and the
//! sequence `attempt = 0..capacity` visits each slot exactly once.

use crate::error::TableError;

/// Polynomial base.
pub const P: i64 = 53;
/// Polynomial modulus.
pub const M: i64 = 1_000_000_007;

/// Primary hash of `key`, in `0..M`.
pub fn primary_hash(key: &str) -> u64 {
    let mut hash: i64 = 0;
    let mut p_pow: i64 = 1;
    for byte in key.bytes() {
        let code = i64::from(byte) - i64::from(b'a') + 1;
        // |code| <= 159 and p_pow < M, so the product fits comfortably in i64.
        hash = (hash + code * p_pow).rem_euclid(M);
        p_pow = (p_pow * P) % M;
    }
    hash as u64
}

/// Secondary hash of `key` for a table of `num_buckets` slots, in
/// `1..num_buckets`.
pub fn secondary_hash(key: &str, num_buckets: usize) -> Result<u64, TableError> {
    if num_buckets <= 1 {
        return Err(TableError::InvalidCapacity(num_buckets));
    }
    Ok(KeyHash::of(key).secondary(num_buckets))
}

/// Slot index tried at `attempt` for `key` in a table of `capacity` slots.
pub fn probe_index(key: &str, capacity: usize, attempt: usize) -> Result<usize, TableError> {
    if capacity <= 1 {
        return Err(TableError::InvalidCapacity(capacity));
    }
    Ok(KeyHash::of(key).index(capacity, attempt))
}

/// A key's primary hash, computed once and stored alongside the entry so
/// that rebuilding the table never rehashes key bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct KeyHash(u64);

impl KeyHash {
    #[inline]
    pub(crate) fn of(key: &str) -> Self {
        KeyHash(primary_hash(key))
    }

    #[inline]
    pub(crate) fn secondary(self, num_buckets: usize) -> u64 {
        debug_assert!(num_buckets > 1);
        1 + self.0 % (num_buckets as u64 - 1)
    }

    /// `(primary + attempt * secondary) mod capacity`. Requires `capacity > 1`.
    #[inline]
    pub(crate) fn index(self, capacity: usize, attempt: usize) -> usize {
        let cap = capacity as u128;
        let step = u128::from(self.secondary(capacity));
        ((u128::from(self.0) + attempt as u128 * step) % cap) as usize
    }
}

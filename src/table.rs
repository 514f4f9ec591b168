//! Table: open-addressing string table with double hashing.

use crate::config::TableConfig;
use crate::error::TableError;
use crate::hasher::KeyHash;
use crate::primes::next_prime;
use core::fmt;
use core::iter::FusedIterator;
use log::{debug, trace};

#[derive(Debug)]
struct Entry {
    key: String,
    value: String,
    hash: KeyHash,
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    /// A removed entry. Lookups probe past it; inserts may reuse it.
    Tombstone,
    Occupied(Entry),
}

impl Slot {
    #[inline]
    fn entry(&self) -> Option<&Entry> {
        match self {
            Slot::Occupied(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    fn is_free(&self) -> bool {
        !matches!(self, Slot::Occupied(_))
    }
}

/// Point-in-time occupancy figures for a table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stats {
    pub size: usize,
    pub count: usize,
    pub load_factor: f64,
    pub tombstones: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size: {}, count: {}, load factor: {:.3}",
            self.size, self.count, self.load_factor
        )
    }
}

/// Open-addressing map from `String` keys to `String` values.
///
/// Capacity is always prime, so each key's double-hashing probe sequence
/// covers every slot. Inserts are upserts. A successful insert never leaves
/// the load factor above the configured maximum.
#[derive(Debug)]
pub struct Table {
    slots: Vec<Slot>,
    count: usize,
    tombstones: usize,
    max_load_factor: f64,
    max_capacity: usize,
}

/// Reserve `capacity` empty slots without aborting on allocation failure.
fn allocate_slots(capacity: usize) -> Result<Vec<Slot>, TableError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity).map_err(|e| {
        debug!("slot allocation of {} failed: {}", capacity, e);
        TableError::AllocationFailure {
            requested: capacity,
        }
    })?;
    slots.resize_with(capacity, Slot::default);
    Ok(slots)
}

/// Place `entry` in the first empty slot of its probe sequence. `slots` must
/// be a fresh array (no tombstones) with prime length greater than the number
/// of entries already placed, so the sequence always reaches an empty slot.
fn place(slots: &mut [Slot], entry: Entry) {
    let capacity = slots.len();
    let mut attempt = 0;
    loop {
        let idx = entry.hash.index(capacity, attempt);
        if let Slot::Empty = slots[idx] {
            slots[idx] = Slot::Occupied(entry);
            return;
        }
        attempt += 1;
        debug_assert!(attempt < capacity, "rebuild target has no empty slot");
    }
}

impl Table {
    /// Table with `initial_capacity` slots (rounded up to a prime) and the
    /// default maximum load factor.
    pub fn new(initial_capacity: usize) -> Result<Self, TableError> {
        Self::with_config(TableConfig::default().with_capacity(initial_capacity))
    }

    /// Table built from `config`; fails if the config is invalid or the
    /// rounded-up prime capacity passes `config.max_capacity`.
    pub fn with_config(config: TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        let capacity =
            next_prime(config.initial_capacity).ok_or(TableError::AllocationFailure {
                requested: config.initial_capacity,
            })?;
        if capacity > config.max_capacity {
            return Err(TableError::CapacityLimit {
                requested: capacity,
                limit: config.max_capacity,
            });
        }
        Ok(Self {
            slots: allocate_slots(capacity)?,
            count: 0,
            tombstones: 0,
            max_load_factor: config.max_load_factor,
            max_capacity: config.max_capacity,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
    /// Number of slots; always prime.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// `len / capacity`.
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Size, count, load factor and tombstone count in one snapshot.
    pub fn stats(&self) -> Stats {
        Stats {
            size: self.capacity(),
            count: self.count,
            load_factor: self.load_factor(),
            tombstones: self.tombstones,
        }
    }

    /// Whether holding `count` entries in `capacity` slots exceeds the maximum.
    #[inline]
    fn over_threshold(&self, count: usize, capacity: usize) -> bool {
        count as f64 > self.max_load_factor * capacity as f64
    }

    /// Slot index holding `key`, probing past tombstones and other keys until
    /// an empty slot or the end of the sequence.
    fn find(&self, key: &str, hash: KeyHash) -> Option<usize> {
        let capacity = self.capacity();
        for attempt in 0..capacity {
            let idx = hash.index(capacity, attempt);
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(e) => {
                    if e.hash == hash && e.key == key {
                        trace!("found {:?} at slot {} (attempt {})", key, idx, attempt);
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    /// First tombstone or empty slot on the probe sequence of `hash`.
    /// Only meaningful for a key known to be absent.
    fn find_vacant(&self, hash: KeyHash) -> Option<usize> {
        let capacity = self.capacity();
        (0..capacity)
            .map(|attempt| hash.index(capacity, attempt))
            .find(|&idx| self.slots[idx].is_free())
    }

    /// Insert or update `key`. Returns the previous value when the key was
    /// already present.
    ///
    /// If a new key would push the load factor over the maximum, the table
    /// grows first; a failed grow returns `AllocationFailure` or
    /// `CapacityLimit` with the table unchanged and the entry not inserted.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, TableError> {
        let key = key.into();
        let value = value.into();
        let hash = KeyHash::of(&key);

        if let Some(idx) = self.find(&key, hash) {
            if let Slot::Occupied(entry) = &mut self.slots[idx] {
                return Ok(Some(core::mem::replace(&mut entry.value, value)));
            }
        }

        if self.over_threshold(self.count + 1, self.capacity()) {
            self.grow()?;
        }
        let idx = loop {
            if let Some(idx) = self.find_vacant(hash) {
                break idx;
            }
            self.grow()?;
        };
        if let Slot::Tombstone = self.slots[idx] {
            self.tombstones -= 1;
        }
        trace!("placing {:?} at slot {}", key, idx);
        self.slots[idx] = Slot::Occupied(Entry { key, value, hash });
        self.count += 1;
        Ok(None)
    }

    /// Remove `key`, returning the owned pair, or `None` if it is absent.
    /// The slot becomes a tombstone until the next rebuild.
    pub fn remove(&mut self, key: &str) -> Option<(String, String)> {
        let idx = self.find(key, KeyHash::of(key))?;
        match core::mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Occupied(entry) => {
                self.count -= 1;
                self.tombstones += 1;
                Some((entry.key, entry.value))
            }
            other => {
                self.slots[idx] = other;
                None
            }
        }
    }

    /// Borrowed value for `key`, or `None` if it is absent.
    pub fn retrieve(&self, key: &str) -> Option<&str> {
        let idx = self.find(key, KeyHash::of(key))?;
        self.slots[idx].entry().map(|e| e.value.as_str())
    }

    /// Whether `key` has a live entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key, KeyHash::of(key)).is_some()
    }

    /// Grow while the load factor exceeds the maximum. Returns whether the
    /// table was rebuilt.
    pub fn resize_if_needed(&mut self) -> Result<bool, TableError> {
        let mut grew = false;
        while self.over_threshold(self.count, self.capacity()) {
            self.grow()?;
            grew = true;
        }
        Ok(grew)
    }

    /// Make room for `additional` more entries with at most one rebuild.
    pub fn reserve(&mut self, additional: usize) -> Result<(), TableError> {
        let needed = self
            .count
            .checked_add(additional)
            .ok_or(TableError::AllocationFailure {
                requested: usize::MAX,
            })?;
        if !self.over_threshold(needed, self.capacity()) {
            return Ok(());
        }
        let min_capacity = (needed as f64 / self.max_load_factor).ceil() as usize;
        let doubled = self.capacity().saturating_mul(2);
        self.resize(min_capacity.max(doubled))
    }

    /// Rebuild into `next_prime(max(min_capacity, capacity))` slots,
    /// dropping tombstones. Capacity never shrinks.
    pub fn resize(&mut self, min_capacity: usize) -> Result<(), TableError> {
        let target = min_capacity.max(self.capacity());
        let capacity = next_prime(target).ok_or(TableError::AllocationFailure {
            requested: target,
        })?;
        self.rebuild(capacity)
    }

    fn grow(&mut self) -> Result<(), TableError> {
        let target = self
            .capacity()
            .checked_mul(2)
            .ok_or(TableError::AllocationFailure {
                requested: usize::MAX,
            })?;
        self.resize(target)
    }

    /// Move every live entry into a fresh array of `capacity` slots. The new
    /// array is fully allocated before anything is moved, so an allocation
    /// failure leaves `self` as it was.
    fn rebuild(&mut self, capacity: usize) -> Result<(), TableError> {
        if capacity > self.max_capacity {
            return Err(TableError::CapacityLimit {
                requested: capacity,
                limit: self.max_capacity,
            });
        }
        let mut slots = allocate_slots(capacity)?;
        debug!(
            "rebuilding table: {} -> {} slots ({} entries, {} tombstones dropped)",
            self.capacity(),
            capacity,
            self.count,
            self.tombstones
        );
        for slot in core::mem::take(&mut self.slots) {
            if let Slot::Occupied(entry) = slot {
                place(&mut slots, entry);
            }
        }
        self.slots = slots;
        self.tombstones = 0;
        Ok(())
    }

    /// Every slot in index order, `None` for empty or cleared slots.
    pub fn slots(&self) -> Slots<'_> {
        Slots {
            it: self.slots.iter().enumerate(),
        }
    }

    /// Live `(key, value)` pairs in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots(),
        }
    }
}

/// Iterator over all slots of a [`Table`], see [`Table::slots`].
#[derive(Clone)]
pub struct Slots<'a> {
    it: core::iter::Enumerate<core::slice::Iter<'a, Slot>>,
}

impl<'a> Iterator for Slots<'a> {
    type Item = (usize, Option<(&'a str, &'a str)>);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(idx, slot)| {
            (
                idx,
                slot.entry().map(|e| (e.key.as_str(), e.value.as_str())),
            )
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl ExactSizeIterator for Slots<'_> {}
impl FusedIterator for Slots<'_> {}

/// Iterator over live entries of a [`Table`], see [`Table::iter`].
#[derive(Clone)]
pub struct Iter<'a> {
    slots: Slots<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().find_map(|(_, entry)| entry)
    }
}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::probe_index;
    use std::collections::BTreeSet;

    /// Two distinct keys sharing the same first probe slot at `capacity`.
    fn colliding_pair(capacity: usize) -> (String, String) {
        let mut by_slot: Vec<Option<String>> = vec![None; capacity];
        for i in 0.. {
            let key = format!("k{i}");
            let slot = probe_index(&key, capacity, 0).unwrap();
            match &by_slot[slot] {
                Some(first) => return (first.clone(), key),
                None => by_slot[slot] = Some(key),
            }
        }
        unreachable!()
    }

    fn occupied(t: &Table) -> usize {
        t.slots().filter(|(_, e)| e.is_some()).count()
    }

    /// Invariant: capacities <= 1 are rejected; others round up to a prime.
    #[test]
    fn new_validates_and_rounds_capacity() {
        assert!(matches!(Table::new(0), Err(TableError::InvalidCapacity(0))));
        assert!(matches!(Table::new(1), Err(TableError::InvalidCapacity(1))));
        assert_eq!(Table::new(2).unwrap().capacity(), 2);
        assert_eq!(Table::new(53).unwrap().capacity(), 53);
        assert_eq!(Table::new(100).unwrap().capacity(), 101);
        let t = Table::new(53).unwrap();
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert_eq!(t.slots().len(), 53);
    }

    /// Invariant: insert is an upsert; count only grows for new keys.
    #[test]
    fn insert_twice_updates_value() {
        let mut t = Table::new(53).unwrap();
        assert_eq!(t.insert("name", "Alice").unwrap(), None);
        assert_eq!(t.insert("name", "Bob").unwrap(), Some("Alice".to_string()));
        assert_eq!(t.len(), 1);
        assert_eq!(t.retrieve("name"), Some("Bob"));
        assert_eq!(occupied(&t), 1);
    }

    /// Invariant: keys colliding on their first slot are both stored and found.
    #[test]
    fn colliding_keys_are_both_retrievable() {
        let (a, b) = colliding_pair(53);
        let mut t = Table::new(53).unwrap();
        t.insert(a.as_str(), "first").unwrap();
        t.insert(b.as_str(), "second").unwrap();
        assert_eq!(t.retrieve(&a), Some("first"));
        assert_eq!(t.retrieve(&b), Some("second"));
        assert_eq!(t.len(), 2);
    }

    /// Invariant: removing the first key of a collision chain leaves a tombstone
    /// so the later key remains reachable.
    #[test]
    fn remove_keeps_later_chain_members_reachable() {
        let (a, b) = colliding_pair(53);
        let mut t = Table::new(53).unwrap();
        t.insert(a.as_str(), "first").unwrap();
        t.insert(b.as_str(), "second").unwrap();

        assert_eq!(t.remove(&a), Some((a.clone(), "first".to_string())));
        assert_eq!(t.retrieve(&a), None);
        assert_eq!(t.retrieve(&b), Some("second"));
        assert_eq!(t.stats().tombstones, 1);

        // Upsert of the later key must find it rather than fill the tombstone.
        assert_eq!(t.insert(b.as_str(), "third").unwrap(), Some("second".into()));
        assert_eq!(t.len(), 1);
        assert_eq!(occupied(&t), 1);

        // A new key reuses the tombstone.
        t.insert(a.as_str(), "again").unwrap();
        assert_eq!(t.stats().tombstones, 0);
        assert_eq!(t.retrieve(&a), Some("again"));
    }

    /// Invariant: removing a missing key is a no-op.
    #[test]
    fn remove_missing_key_leaves_count() {
        let mut t = Table::new(53).unwrap();
        t.insert("age", "30").unwrap();
        assert_eq!(t.remove("name"), None);
        assert_eq!(t.len(), 1);
        assert_eq!(t.stats().tombstones, 0);
    }

    /// Invariant: growth happens on the insert that would exceed the maximum
    /// load factor, lands on the next prime >= 2x, and drops tombstones.
    #[test]
    fn grows_on_threshold_crossing() {
        let mut t = Table::new(53).unwrap();
        for i in 0..37 {
            t.insert(format!("key{i}"), i.to_string()).unwrap();
        }
        // 37 / 53 = 0.698
        assert_eq!(t.capacity(), 53);
        t.remove("key0");
        t.insert("key0", "0").unwrap();
        assert_eq!(t.capacity(), 53);

        t.insert("key37", "37").unwrap();
        assert_eq!(t.capacity(), 107);
        assert_eq!(t.len(), 38);
        assert_eq!(t.stats().tombstones, 0);
        for i in 0..38 {
            assert_eq!(t.retrieve(&format!("key{i}")), Some(i.to_string().as_str()));
        }
        assert!(t.load_factor() <= t.max_load_factor());
    }

    /// Invariant: tiny tables grow through several primes and keep every entry.
    #[test]
    fn smallest_table_grows_repeatedly() {
        let mut t = Table::new(2).unwrap();
        for i in 0..100 {
            t.insert(format!("k{i}"), format!("v{i}")).unwrap();
            assert!(crate::primes::is_prime(t.capacity() as u64));
            assert!(t.load_factor() <= 0.7);
        }
        assert_eq!(t.len(), 100);
        for i in 0..100 {
            assert_eq!(t.retrieve(&format!("k{i}")), Some(format!("v{i}").as_str()));
        }
    }

    /// Invariant: every occupied slot lies on its key's probe sequence.
    #[test]
    fn occupied_slots_are_reachable_by_probing() {
        let mut t = Table::new(11).unwrap();
        for i in 0..40 {
            t.insert(format!("x{i}"), "v").unwrap();
            if i % 3 == 0 {
                t.remove(&format!("x{}", i / 2));
            }
        }
        let cap = t.capacity();
        for (idx, entry) in t.slots() {
            if let Some((key, _)) = entry {
                assert!((0..cap).any(|a| probe_index(key, cap, a).unwrap() == idx));
            }
        }
        assert_eq!(occupied(&t), t.len());
    }

    /// Invariant: resize never shrinks and rebuilds to a prime.
    #[test]
    fn resize_is_monotonic() {
        let mut t = Table::new(53).unwrap();
        t.insert("a", "1").unwrap();
        t.resize(10).unwrap();
        assert_eq!(t.capacity(), 53);
        t.resize(200).unwrap();
        assert_eq!(t.capacity(), 211);
        assert_eq!(t.retrieve("a"), Some("1"));
    }

    /// Invariant: a failed resize leaves slots, capacity and count untouched.
    #[test]
    fn failed_resize_leaves_table_unchanged() {
        let mut t = Table::new(53).unwrap();
        t.insert("name", "Alice").unwrap();
        t.insert("age", "30").unwrap();
        t.remove("name");

        for request in [usize::MAX, usize::MAX / 2] {
            match t.resize(request) {
                Err(TableError::AllocationFailure { .. }) => {}
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(t.capacity(), 53);
            assert_eq!(t.len(), 1);
            assert_eq!(t.stats().tombstones, 1);
            assert_eq!(t.retrieve("age"), Some("30"));
        }
    }

    /// Invariant: when the grow triggered by an insert fails, the insert fails
    /// as a whole: the key is absent and slots, capacity and count are as before.
    #[test]
    fn failed_grow_during_insert_leaves_table_unchanged() {
        let config = TableConfig::default()
            .with_capacity(5)
            .with_max_capacity(10);
        let mut t = Table::with_config(config).unwrap();
        for k in ["a", "b", "c"] {
            t.insert(k, k).unwrap();
        }
        // 4 / 5 would pass 0.7; growth needs 11 slots, past the limit.
        let before: Vec<(usize, Option<(String, String)>)> = t
            .slots()
            .map(|(i, e)| (i, e.map(|(k, v)| (k.to_string(), v.to_string()))))
            .collect();

        match t.insert("d", "d") {
            Err(TableError::CapacityLimit {
                requested: 11,
                limit: 10,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(t.len(), 3);
        assert_eq!(t.capacity(), 5);
        assert_eq!(t.retrieve("d"), None);
        assert!(!t.contains_key("d"));
        for k in ["a", "b", "c"] {
            assert_eq!(t.retrieve(k), Some(k));
        }
        let after: Vec<(usize, Option<(String, String)>)> = t
            .slots()
            .map(|(i, e)| (i, e.map(|(k, v)| (k.to_string(), v.to_string()))))
            .collect();
        assert_eq!(before, after);

        // Upserts of existing keys need no growth and still succeed.
        assert_eq!(t.insert("a", "A").unwrap(), Some("a".to_string()));
        assert_eq!(t.len(), 3);
    }

    /// Invariant: a reserve that would pass the limit fails without side effects.
    #[test]
    fn reserve_past_limit_leaves_table_unchanged() {
        let config = TableConfig::default()
            .with_capacity(53)
            .with_max_capacity(100);
        let mut t = Table::with_config(config).unwrap();
        t.insert("name", "Alice").unwrap();
        assert!(matches!(
            t.reserve(1_000),
            Err(TableError::CapacityLimit { limit: 100, .. })
        ));
        assert_eq!(t.capacity(), 53);
        assert_eq!(t.len(), 1);
        assert_eq!(t.retrieve("name"), Some("Alice"));
        // Rounding the initial capacity up to a prime is checked too.
        assert!(matches!(
            Table::with_config(TableConfig::default().with_capacity(100).with_max_capacity(100)),
            Err(TableError::CapacityLimit {
                requested: 101,
                limit: 100
            })
        ));
    }

    /// Invariant: reserve grows once, enough for the announced entries.
    #[test]
    fn reserve_grows_once_for_bulk_inserts() {
        let mut t = Table::new(53).unwrap();
        t.reserve(10).unwrap();
        assert_eq!(t.capacity(), 53);
        t.reserve(200).unwrap();
        let cap = t.capacity();
        assert!(cap as f64 * 0.7 >= 200.0);
        for i in 0..200 {
            t.insert(format!("b{i}"), "v").unwrap();
        }
        assert_eq!(t.capacity(), cap);
    }

    /// Invariant: resize_if_needed is a no-op under the threshold.
    #[test]
    fn resize_if_needed_without_pressure() {
        let mut t = Table::new(53).unwrap();
        t.insert("a", "1").unwrap();
        assert!(!t.resize_if_needed().unwrap());
        assert_eq!(t.capacity(), 53);
    }

    /// Invariant: slots() and iter() are restartable and agree with len.
    #[test]
    fn iteration_is_restartable() {
        let mut t = Table::new(7).unwrap();
        for k in ["one", "two", "three"] {
            t.insert(k, k.to_uppercase()).unwrap();
        }
        let it = t.iter();
        let first: BTreeSet<_> = it.clone().collect();
        let second: BTreeSet<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), t.len());
        assert!(first.contains(&("two", "TWO")));
        let via_ref: Vec<_> = (&t).into_iter().collect();
        assert_eq!(via_ref.len(), 3);
        assert_eq!(t.slots().count(), t.capacity());
    }

    /// Invariant: a custom load factor is honored.
    #[test]
    fn custom_load_factor() {
        let config = TableConfig::default()
            .with_capacity(11)
            .with_max_load_factor(0.5);
        let mut t = Table::with_config(config).unwrap();
        for i in 0..5 {
            t.insert(format!("c{i}"), "v").unwrap();
        }
        assert_eq!(t.capacity(), 11);
        t.insert("c5", "v").unwrap();
        assert_eq!(t.capacity(), 23);
    }

    #[test]
    fn stats_display() {
        let mut t = Table::new(53).unwrap();
        t.insert("name", "Alice").unwrap();
        let s = t.stats();
        assert_eq!(s.size, 53);
        assert_eq!(s.count, 1);
        assert_eq!(s.to_string(), "size: 53, count: 1, load factor: 0.019");
    }
}

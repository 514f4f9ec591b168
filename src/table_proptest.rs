#![cfg(test)]

// Property tests for Table kept inside the crate so they can reach the
// hasher's probe sequence directly.

use crate::config::TableConfig;
use crate::hasher::probe_index;
use crate::primes::is_prime;
use crate::table::Table;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, String),
    Remove(usize),
    Retrieve(usize),
    Contains(String),
    Resize(usize),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-zA-Z0-9]{1,6}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), "[a-z]{0,4}").prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Retrieve),
            1 => "[a-z0-9]{1,6}".prop_map(OpI::Contains),
            1 => (0usize..64).prop_map(OpI::Resize),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Structural post-conditions that must hold after every operation.
fn check_structure(sut: &Table) -> Result<(), TestCaseError> {
    let cap = sut.capacity();
    prop_assert!(is_prime(cap as u64), "capacity {} is not prime", cap);
    prop_assert!(sut.load_factor() <= sut.max_load_factor());

    let mut occupied = 0;
    let mut keys = BTreeSet::new();
    for (idx, entry) in sut.slots() {
        if let Some((key, _)) = entry {
            occupied += 1;
            prop_assert!(keys.insert(key.to_string()), "duplicate key {}", key);
            let reachable = (0..cap).any(|a| probe_index(key, cap, a).unwrap() == idx);
            prop_assert!(reachable, "{} at slot {} is off its probe sequence", key, idx);
        }
    }
    prop_assert_eq!(occupied, sut.len());
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - insert upserts and returns the previous value exactly when the model had one.
// - remove returns the owned pair iff the key is live; retrieve/contains parity.
// - iter yields each live entry exactly once and matches the model.
// - count equals occupied slots, keys are unique, capacity stays prime,
//   load factor stays under the maximum, every entry lies on its probe sequence.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), start in 2usize..16) {
        let mut sut = Table::new(start).unwrap();
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                OpI::Insert(i, v) => {
                    let k = pool[i].clone();
                    let prev = sut.insert(k.as_str(), v.as_str()).unwrap();
                    prop_assert_eq!(prev, model.insert(k, v));
                }
                OpI::Remove(i) => {
                    let k = &pool[i];
                    let removed = sut.remove(k);
                    let expected = model.remove(k).map(|v| (k.clone(), v));
                    prop_assert_eq!(removed, expected);
                }
                OpI::Retrieve(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.retrieve(k), model.get(k).map(String::as_str));
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
                }
                OpI::Resize(n) => {
                    let before = sut.capacity();
                    sut.resize(n).unwrap();
                    prop_assert!(sut.capacity() >= before);
                    prop_assert_eq!(sut.stats().tombstones, 0);
                }
                OpI::Iterate => {
                    let s_pairs: BTreeSet<_> = sut
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    let m_pairs: BTreeSet<_> = model.clone().into_iter().collect();
                    prop_assert_eq!(s_pairs, m_pairs);
                }
            }

            check_structure(&sut)?;
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }

        // Every model key is still reachable at the end.
        for (k, v) in &model {
            prop_assert_eq!(sut.retrieve(k), Some(v.as_str()));
        }
    }
}

// Property: heavy churn (repeated insert/remove of the same small key set)
// accumulates tombstones in a table that never grows, yet lookups stay exact.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_churn_with_tombstones(rounds in proptest::collection::vec(proptest::collection::vec(0usize..8, 1..8), 1..40)) {
        let config = TableConfig::default().with_capacity(13).with_max_load_factor(0.7);
        let mut sut = Table::with_config(config).unwrap();
        let mut model: HashMap<String, String> = HashMap::new();

        for (round, picks) in rounds.into_iter().enumerate() {
            for p in &picks {
                let k = format!("churn{p}");
                let v = format!("r{round}");
                sut.insert(k.as_str(), v.as_str()).unwrap();
                model.insert(k, v);
            }
            for p in picks.iter().step_by(2) {
                let k = format!("churn{p}");
                prop_assert_eq!(sut.remove(&k).is_some(), model.remove(&k).is_some());
            }
            // At most 8 keys live; 13 * 0.7 = 9.1 so the table never grows.
            prop_assert_eq!(sut.capacity(), 13);
            check_structure(&sut)?;
            for p in 0..8 {
                let k = format!("churn{p}");
                prop_assert_eq!(sut.retrieve(&k), model.get(&k).map(String::as_str));
            }
        }
    }
}

#![cfg(test)]

// Property tests for KeySetMap kept inside the crate so every step can be
// audited with check_invariants, which needs no feature gates here.
//
// Model: std HashMap<BTreeSet<u8>, i32>. A raw key is a short Vec<u8> drawn
// from a small element universe; it may carry duplicates (collapsed by both
// sides) or be empty (rejected by insert, absent everywhere else). Queries
// present the elements in reversed order so no test ever relies on spelling.

use crate::{InsertError, KeySet, KeySetMap};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

type Elem = u8;

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<Elem>, i32),
    Remove(Vec<Elem>),
    Get(Vec<Elem>),
    Contains(Vec<Elem>),
    Mutate(Vec<Elem>, i32),
    Retain(i32),
    Clear,
}

// Small universe so keys collide and rows grow multiple entries.
fn arb_raw_key() -> impl Strategy<Value = Vec<Elem>> {
    proptest::collection::vec(0u8..8, 0..=5)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (arb_raw_key(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => arb_raw_key().prop_map(Op::Remove),
        2 => arb_raw_key().prop_map(Op::Get),
        1 => arb_raw_key().prop_map(Op::Contains),
        1 => (arb_raw_key(), -10i32..10).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => any::<i32>().prop_map(Op::Retain),
        1 => Just(Op::Clear),
    ]
}

fn model_key(raw: &[Elem]) -> BTreeSet<Elem> {
    raw.iter().copied().collect()
}

// Insertion spelling: as generated. Query spelling: reversed.
fn insert_key(raw: &[Elem]) -> KeySet<Elem> {
    raw.iter().copied().collect()
}

fn query_key(raw: &[Elem]) -> KeySet<Elem> {
    raw.iter().rev().copied().collect()
}

proptest! {
    // The map agrees with the model after every operation, and the
    // store/index pair stays internally consistent throughout arbitrary
    // churn.
    #[test]
    fn prop_matches_model_map(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let mut m: KeySetMap<Elem, i32> = KeySetMap::new();
        let mut model: HashMap<BTreeSet<Elem>, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(raw, v) => {
                    let set = model_key(&raw);
                    if set.is_empty() {
                        prop_assert!(matches!(
                            m.insert(insert_key(&raw), v),
                            Err(InsertError::EmptyKey)
                        ));
                    } else {
                        let old = m.insert(insert_key(&raw), v).unwrap();
                        prop_assert_eq!(old, model.insert(set, v));
                    }
                }
                Op::Remove(raw) => {
                    let removed = m.remove(&query_key(&raw));
                    prop_assert_eq!(removed, model.remove(&model_key(&raw)));
                }
                Op::Get(raw) => {
                    let got = m.get(&query_key(&raw)).copied();
                    prop_assert_eq!(got, model.get(&model_key(&raw)).copied());
                }
                Op::Contains(raw) => {
                    prop_assert_eq!(
                        m.contains_key(&query_key(&raw)),
                        model.contains_key(&model_key(&raw))
                    );
                }
                Op::Mutate(raw, d) => {
                    if let Some(v) = m.get_mut(&query_key(&raw)) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&model_key(&raw)) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Retain(threshold) => {
                    m.retain(|_k, v| *v >= threshold);
                    model.retain(|_k, v| *v >= threshold);
                }
                Op::Clear => {
                    m.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(m.len(), model.len());
            if let Err(msg) = m.check_invariants() {
                prop_assert!(false, "invariant violated: {}", msg);
            }
        }

        // Final sweep: iteration reproduces the model exactly.
        let seen: HashMap<BTreeSet<Elem>, i32> = m
            .iter()
            .map(|(_h, k, v)| (k.iter().copied().collect(), *v))
            .collect();
        prop_assert_eq!(seen, model);
    }

    // Handles stay pinned to their entry across unrelated churn and go
    // stale exactly when their entry is removed.
    #[test]
    fn prop_handles_track_their_entry(
        raws in proptest::collection::vec(proptest::collection::vec(0u8..8, 1..=4), 1..12),
        victim in 0usize..12,
    ) {
        let mut m: KeySetMap<Elem, usize> = KeySetMap::new();
        let mut handles = Vec::new();

        for (i, raw) in raws.iter().enumerate() {
            match m.insert(insert_key(raw), i) {
                Ok(None) => handles.push((m.find(&query_key(raw)).unwrap(), model_key(raw))),
                Ok(Some(_)) => {} // equivalent key already tracked
                Err(InsertError::EmptyKey) => unreachable!("raw keys are non-empty"),
            }
        }

        // Remove one tracked entry (if any index is in range).
        let removed = handles
            .get(victim)
            .map(|(_h, set)| set.clone())
            .map(|set| {
                let k: KeySet<Elem> = set.iter().copied().collect();
                m.remove(&k).unwrap();
                set
            });

        for (h, set) in &handles {
            let expect_live = removed.as_ref() != Some(set);
            prop_assert_eq!(h.value(&m).is_some(), expect_live);
            if let Some(stored) = h.key(&m) {
                let stored_set: BTreeSet<Elem> = stored.iter().copied().collect();
                prop_assert_eq!(&stored_set, set);
            }
        }
        if let Err(msg) = m.check_invariants() {
            prop_assert!(false, "invariant violated: {}", msg);
        }
    }
}

//! ElementIndex: per-element rows of canonical-key slots, powering resolution.
//!
//! One row per element that occurs in at least one stored key. A row lists
//! every canonical key containing the element, as a `(slot, cardinality)`
//! pair. Resolution intersects the candidate's rows, starting from the
//! shortest; the recorded cardinality prunes keys that cannot match before
//! any membership probing happens.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table::Entry;
use hashbrown::HashTable;
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

use crate::key_set::KeySet;

/// One registered canonical key as seen from a row: the slot naming it in
/// the store, plus that key's cardinality.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RowEntry {
    pub(crate) slot: DefaultKey,
    pub(crate) width: usize,
}

struct Row<E> {
    element: E,
    hash: u64,
    keys: Vec<RowEntry>,
}

pub(crate) struct ElementIndex<E, S = RandomState> {
    hasher: S,
    rows: HashTable<Row<E>>,
}

impl<E, S> ElementIndex<E, S>
where
    E: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            rows: HashTable::new(),
        }
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    fn make_hash(&self, elem: &E) -> u64 {
        self.hasher.hash_one(elem)
    }

    fn row(&self, elem: &E) -> Option<&Row<E>> {
        let hash = self.make_hash(elem);
        self.rows.find(hash, |r| r.element == *elem)
    }

    /// Find the one stored key with exactly the candidate's elements.
    ///
    /// A key matches iff its cardinality equals the candidate's and it
    /// appears in the row of every candidate element: equal cardinality plus
    /// superset membership is exact membership. Empty candidates never
    /// resolve.
    pub(crate) fn resolve(&self, candidate: &KeySet<E>) -> Option<DefaultKey> {
        let width = candidate.len();
        if width == 0 {
            return None;
        }

        let mut rows: Vec<&Row<E>> = Vec::with_capacity(width);
        for elem in candidate {
            // An element no stored key contains settles the search.
            rows.push(self.row(elem)?);
        }
        // Scanning the shortest row first minimizes membership probes. Pure
        // heuristic: any row would yield the same answer.
        rows.sort_unstable_by_key(|row| row.keys.len());
        let (first, rest) = rows.split_first()?;

        'candidates: for entry in &first.keys {
            if entry.width != width {
                continue;
            }
            for row in rest {
                if !row.keys.iter().any(|other| other.slot == entry.slot) {
                    continue 'candidates;
                }
            }
            return Some(entry.slot);
        }
        None
    }

    /// Add `slot` to the row of every element of `key`, creating rows as
    /// needed. Called only by the store, paired with the slot insertion.
    pub(crate) fn register(&mut self, slot: DefaultKey, key: &KeySet<E>)
    where
        E: Clone,
    {
        let width = key.len();
        for elem in key {
            let hash = self.make_hash(elem);
            match self.rows.entry(hash, |r| r.element == *elem, |r| r.hash) {
                Entry::Occupied(row) => row.into_mut().keys.push(RowEntry { slot, width }),
                Entry::Vacant(vacant) => {
                    let _ = vacant.insert(Row {
                        element: elem.clone(),
                        hash,
                        keys: vec![RowEntry { slot, width }],
                    });
                }
            }
        }
    }

    /// Remove `slot` from the row of every element of `key`; rows left empty
    /// are deleted rather than kept around. Paired with the slot removal.
    pub(crate) fn unregister(&mut self, slot: DefaultKey, key: &KeySet<E>) {
        for elem in key {
            let hash = self.make_hash(elem);
            if let Ok(mut row) = self.rows.find_entry(hash, |r| r.element == *elem) {
                let keys = &mut row.get_mut().keys;
                if let Some(at) = keys.iter().position(|entry| entry.slot == slot) {
                    keys.swap_remove(at);
                }
                if row.get().keys.is_empty() {
                    row.remove();
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    /// Row-by-row view for the store's invariant auditor.
    pub(crate) fn iter_rows(&self) -> impl Iterator<Item = (&E, &[RowEntry])> {
        self.rows.iter().map(|row| (&row.element, row.keys.as_slice()))
    }

    #[cfg(test)]
    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

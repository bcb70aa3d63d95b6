//! KeySetMap: the canonical store and the public map surface.

use core::hash::{BuildHasher, Hash};
use core::mem;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

use crate::element_index::ElementIndex;
use crate::key_set::KeySet;

/// Generational name of a live entry.
///
/// `find` and iteration hand these out; accessors go straight to the slot
/// without re-resolving the key, and answer `None` once the entry has been
/// removed (slot generations make stale handles detectable, they never alias
/// a later entry). A handle is only meaningful with the map that produced it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(slot: DefaultKey) -> Self {
        Handle(slot)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, E, V, S>(&self, map: &'a KeySetMap<E, V, S>) -> Option<&'a KeySet<E>>
    where
        E: Eq + Hash,
        S: BuildHasher + Clone + Default,
    {
        map.handle_key(*self)
    }

    pub fn value<'a, E, V, S>(&self, map: &'a KeySetMap<E, V, S>) -> Option<&'a V>
    where
        E: Eq + Hash,
        S: BuildHasher + Clone + Default,
    {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, E, V, S>(&self, map: &'a mut KeySetMap<E, V, S>) -> Option<&'a mut V>
    where
        E: Eq + Hash,
        S: BuildHasher + Clone + Default,
    {
        map.handle_value_mut(*self)
    }
}

#[derive(Debug)]
struct Entry<E, V> {
    key: KeySet<E>,
    value: V,
}

/// A map keyed by [`KeySet`]s. Candidates with the same element membership,
/// in any order, address the same entry.
pub struct KeySetMap<E, V, S = RandomState> {
    slots: SlotMap<DefaultKey, Entry<E, V>>, // storage using generational keys
    index: ElementIndex<E, S>,
}

#[derive(Debug)]
pub enum InsertError {
    /// Empty keys are unsupported: no resolution can ever find one, so
    /// storing it would let a second empty insert duplicate the entry.
    EmptyKey,
}

impl<E, V> KeySetMap<E, V>
where
    E: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<E, V> Default for KeySetMap<E, V>
where
    E: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over immutable entries in `KeySetMap`.
pub struct Iter<'a, E, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<E, V>>,
}

impl<'a, E, V> Iterator for Iter<'a, E, V> {
    type Item = (Handle, &'a KeySet<E>, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(slot, e)| (Handle::new(slot), &e.key, &e.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Iterator over mutable entries in `KeySetMap`. Keys stay frozen; only
/// values are handed out mutably.
pub struct IterMut<'a, E, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<E, V>>,
}

impl<'a, E, V> Iterator for IterMut<'a, E, V> {
    type Item = (Handle, &'a KeySet<E>, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(slot, e)| (Handle::new(slot), &e.key, &mut e.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Consuming iterator yielding owned `(KeySet, V)` pairs.
pub struct IntoIter<E, V> {
    it: slotmap::basic::IntoIter<DefaultKey, Entry<E, V>>,
}

impl<E, V> Iterator for IntoIter<E, V> {
    type Item = (KeySet<E>, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_slot, e)| (e.key, e.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<E, V, S> KeySetMap<E, V, S>
where
    E: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            slots: SlotMap::with_key(),
            index: ElementIndex::with_hasher(hasher),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert or replace. If a key equivalent to `key` is already stored,
    /// its value is replaced in place (the stored canonical key and the
    /// index are untouched) and the previous value is returned. Otherwise
    /// `key` becomes the canonical key for its equivalence class.
    pub fn insert(&mut self, key: KeySet<E>, value: V) -> Result<Option<V>, InsertError>
    where
        E: Clone,
    {
        if key.is_empty() {
            return Err(InsertError::EmptyKey);
        }
        if let Some(slot) = self.index.resolve(&key) {
            let entry = self
                .slots
                .get_mut(slot)
                .expect("resolved slot must be live");
            return Ok(Some(mem::replace(&mut entry.value, value)));
        }
        let slot = self.slots.insert(Entry { key, value });
        let entry = self
            .slots
            .get(slot)
            .expect("entry must exist immediately after insert");
        self.index.register(slot, &entry.key);
        Ok(None)
    }

    pub fn get(&self, key: &KeySet<E>) -> Option<&V> {
        let slot = self.index.resolve(key)?;
        self.slots.get(slot).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &KeySet<E>) -> Option<&mut V> {
        let slot = self.index.resolve(key)?;
        self.slots.get_mut(slot).map(|e| &mut e.value)
    }

    /// Like `get`, but also lends the stored canonical key.
    pub fn get_key_value(&self, key: &KeySet<E>) -> Option<(&KeySet<E>, &V)> {
        let slot = self.index.resolve(key)?;
        self.slots.get(slot).map(|e| (&e.key, &e.value))
    }

    pub fn contains_key(&self, key: &KeySet<E>) -> bool {
        self.index.resolve(key).is_some()
    }

    /// Resolve once, keep the handle: subsequent accesses through the
    /// returned [`Handle`] skip the element-index search entirely.
    pub fn find(&self, key: &KeySet<E>) -> Option<Handle> {
        self.index.resolve(key).map(Handle::new)
    }

    pub fn remove(&mut self, key: &KeySet<E>) -> Option<V> {
        self.remove_entry(key).map(|(_key, value)| value)
    }

    pub fn remove_entry(&mut self, key: &KeySet<E>) -> Option<(KeySet<E>, V)> {
        let slot = self.index.resolve(key)?;
        self.take_slot(slot)
    }

    fn take_slot(&mut self, slot: DefaultKey) -> Option<(KeySet<E>, V)> {
        // Unlink the index first: both structures are consistent again
        // before the entry (and any user data inside it) leaves the map.
        let entry = self.slots.get(slot)?;
        self.index.unregister(slot, &entry.key);
        let entry = self.slots.remove(slot).expect("slot checked live above");
        Some((entry.key, entry.value))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    /// Iterate entries in slot order: stable for a given map state, no
    /// further ordering promised. Restartable; each call is a fresh pass.
    pub fn iter(&self) -> Iter<'_, E, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, E, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeySet<E>> {
        self.slots.iter().map(|(_slot, e)| &e.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().map(|(_slot, e)| &e.value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.slots.iter_mut().map(|(_slot, e)| &mut e.value)
    }

    /// Keep only the entries the predicate approves; the value is mutable
    /// during the decision. Rejected entries leave through the same
    /// unregister-then-free path as `remove`.
    pub fn retain<F>(&mut self, mut pred: F)
    where
        F: FnMut(&KeySet<E>, &mut V) -> bool,
    {
        let doomed: Vec<DefaultKey> = self
            .slots
            .iter_mut()
            .filter_map(|(slot, e)| {
                if pred(&e.key, &mut e.value) {
                    None
                } else {
                    Some(slot)
                }
            })
            .collect();
        for slot in doomed {
            let _ = self.take_slot(slot);
        }
    }

    /// A new, independent map holding clones of the entries the predicate
    /// approves. The copy is populated through `insert`, so it builds its
    /// own canonical keys and its own index; mutating it never touches
    /// `self`.
    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        E: Clone,
        V: Clone,
        F: FnMut(&KeySet<E>, &V) -> bool,
    {
        let mut out = Self::with_hasher(self.index.hasher().clone());
        for (_slot, entry) in self.slots.iter() {
            if pred(&entry.key, &entry.value) {
                let replaced = out
                    .insert(entry.key.clone(), entry.value.clone())
                    .expect("canonical keys are never empty");
                debug_assert!(replaced.is_none(), "source map held equivalent keys");
            }
        }
        out
    }

    /// A new, independent map with every value passed through `f`. Same
    /// isolation guarantee as `filter`.
    pub fn map_values<U, F>(&self, mut f: F) -> KeySetMap<E, U, S>
    where
        E: Clone,
        F: FnMut(&KeySet<E>, &V) -> U,
    {
        let mut out: KeySetMap<E, U, S> = KeySetMap::with_hasher(self.index.hasher().clone());
        for (_slot, entry) in self.slots.iter() {
            let mapped = f(&entry.key, &entry.value);
            let replaced = out
                .insert(entry.key.clone(), mapped)
                .expect("canonical keys are never empty");
            debug_assert!(replaced.is_none(), "source map held equivalent keys");
        }
        out
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&KeySet<E>> {
        self.slots.get(h.raw()).map(|e| &e.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.slots.get(h.raw()).map(|e| &e.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.slots.get_mut(h.raw()).map(|e| &mut e.value)
    }

    /// Audit the store/index pair. Walks every row and every slot and
    /// verifies: rows are non-empty and duplicate-free, every row entry
    /// points at a live key that contains the row's element with the
    /// recorded cardinality, every stored key is non-empty and resolves
    /// back to its own slot, and the total row membership matches the total
    /// key membership (so no row entry exists that no key explains).
    #[doc(hidden)]
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        let mut row_entries = 0usize;
        for (element, entries) in self.index.iter_rows() {
            if entries.is_empty() {
                return Err("empty row retained");
            }
            for (i, entry) in entries.iter().enumerate() {
                let stored = self
                    .slots
                    .get(entry.slot)
                    .ok_or("row references a freed slot")?;
                if !stored.key.contains(element) {
                    return Err("row lists a key missing its element");
                }
                if stored.key.len() != entry.width {
                    return Err("row width disagrees with key cardinality");
                }
                if entries[..i].iter().any(|prev| prev.slot == entry.slot) {
                    return Err("duplicate slot within a row");
                }
            }
            row_entries += entries.len();
        }

        let mut key_memberships = 0usize;
        for (slot, entry) in self.slots.iter() {
            if entry.key.is_empty() {
                return Err("empty canonical key stored");
            }
            key_memberships += entry.key.len();
            match self.index.resolve(&entry.key) {
                Some(found) if found == slot => {}
                Some(_) => return Err("stored key resolves to a different slot"),
                None => return Err("stored key does not resolve"),
            }
        }

        if row_entries != key_memberships {
            return Err("row membership count disagrees with key membership count");
        }
        Ok(())
    }
}

impl<'a, E, V, S> IntoIterator for &'a KeySetMap<E, V, S>
where
    E: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    type Item = (Handle, &'a KeySet<E>, &'a V);
    type IntoIter = Iter<'a, E, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E, V, S> IntoIterator for KeySetMap<E, V, S>
where
    E: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    type Item = (KeySet<E>, V);
    type IntoIter = IntoIter<E, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.slots.into_iter(),
        }
    }
}

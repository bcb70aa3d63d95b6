//! keyset-hashmap: a single-threaded map keyed by unordered element sets,
//! where every candidate key with the same membership resolves to one
//! canonical stored entry.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: make "the set {a, b}" a usable map key: `{a, b}`, `{b, a}`, and
//!   any other spelling of the same membership must address the same entry,
//!   without scanning every stored key on lookup.
//! - Layers:
//!   - KeySet<E>: the unordered, duplicate-free element collection used for
//!     both candidate and canonical keys. Deduplicates at construction and
//!     exposes no mutating API, so a stored key can never drift out from
//!     under the index.
//!   - ElementIndex<E, S> (internal): one row per live element listing the
//!     canonical keys containing it, with each key's cardinality. This is
//!     what turns "a candidate with arbitrary elements" into "the one stored
//!     key with exactly those elements" in sub-linear time.
//!   - KeySetMap<E, V, S>: public API. Owns the entry storage (a SlotMap of
//!     (KeySet, V) entries behind generational slots) and its ElementIndex,
//!     and keeps the two consistent inside every operation.
//!
//! Resolution
//! - A candidate resolves by fetching the row of each of its elements (any
//!   missing row is a definitive miss), then scanning the shortest row for a
//!   key whose recorded cardinality equals the candidate's and which appears
//!   in every other row. Equal cardinality plus membership in every row is
//!   exact membership equality, so no key/key comparison is ever needed.
//!   Cost is O(|candidate| x shortest-row length) worst case; the
//!   cardinality filter and shortest-row-first order keep the practical cost
//!   far below that.
//! - Callers that keep the `Handle` returned by `find` (or yielded during
//!   iteration) skip resolution entirely: a handle names its slot
//!   generationally, accesses are O(1), and a stale handle answers `None`
//!   instead of aliasing a later entry.
//!
//! Constraints
//! - Single-threaded, synchronous: mutations take `&mut self`, reads take
//!   `&self`; there is no interior mutability anywhere.
//! - Exact-membership matching only: no subset, superset, or fuzzy matches.
//! - Elements need `Eq + Hash`; they are cloned into index rows but never
//!   mutated or ordered.
//! - Empty keys are unsupported: resolution treats them as always-absent and
//!   `insert` rejects them (`InsertError::EmptyKey`), because a stored empty
//!   key could never be found again and a second empty insert would then
//!   duplicate its equivalence class.
//!
//! Invariants (hold after every public operation)
//! - One canonical key per equivalence class.
//! - A key appears in the row of an element iff the key contains the
//!   element (bidirectional store/index agreement).
//! - Rows never hold freed slots; rows that would become empty are deleted.
//! - Store and index mutate together within one operation; derived maps
//!   (`filter`, `map_values`) are populated only through `insert` so they
//!   rebuild their own index instead of borrowing the source's.
//!
//! Why this split?
//! - The index is the only clever part; keeping it a self-contained
//!   component with three entry points (resolve/register/unregister) makes
//!   its row invariants easy to state and audit.
//! - The map layer stays a thin wrapper: every public operation is
//!   resolve-then-slot-access plus, for mutations, one paired index update.
//! - `check_invariants` (hidden, test-facing) walks both halves and is run
//!   by the property tests after every operation.

mod element_index;
pub mod key_set;
mod key_set_map;
mod key_set_map_proptest;

// Public surface
pub use key_set::KeySet;
pub use key_set_map::{Handle, InsertError, IntoIter, Iter, IterMut, KeySetMap};

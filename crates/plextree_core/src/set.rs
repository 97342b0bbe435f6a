//! Multi-index coordinator.
//!
//! A [`MultiIndexSet`] owns the node pool and drives one AVL engine per
//! declared index in lock-step: every element is linked into every index,
//! and a mutation is observable only as a whole. Insertion is all-or-nothing
//! across indexes — every index validates the candidate before any tree is
//! touched — and erasure unlinks from every index before the node's storage
//! is released.
//!
//! # Example
//!
//! ```
//! use plextree_core::MultiIndexSet;
//!
//! #[derive(Debug)]
//! struct Order {
//!     id: u64,
//!     fee: i64,
//! }
//!
//! let mut builder = MultiIndexSet::builder();
//! let by_id = builder.ordered_unique("id", |o: &Order| o.id).unwrap();
//! let by_fee = builder.ordered_non_unique("fee", |o: &Order| o.fee).unwrap();
//! let mut book = builder.build().unwrap();
//!
//! book.insert(Order { id: 1, fee: 700 });
//! book.insert(Order { id: 2, fee: 250 });
//!
//! let cheap = book.begin(by_fee.id());
//! assert_eq!(book.get(cheap).unwrap().id, 2);
//! assert!(!book.find(&by_id, &1).is_end());
//! ```

use crate::arena::{Arena, NodeId};
use crate::cursor::{Cursor, Iter, Range};
use crate::error::{CoreError, CoreResult};
use crate::index::{IndexHandle, IndexId, IndexSpec, LinkSet, Placement};
use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;
use tracing::{debug, trace};

/// Declares the orderings of a [`MultiIndexSet`] before it is built.
///
/// Each `ordered_*` call registers one index and returns its typed
/// [`IndexHandle`]. At least one index is required; the first one declared
/// is the primary ordering.
pub struct SetBuilder<T: 'static> {
    specs: Vec<IndexSpec<T>>,
}

impl<T: 'static> SetBuilder<T> {
    fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Declares a sorted-unique index keyed by `extract`.
    ///
    /// Insertion of an element whose key equals an existing element's key
    /// is rejected, atomically, for the whole set.
    pub fn ordered_unique<K, F>(
        &mut self,
        name: impl Into<String>,
        extract: F,
    ) -> CoreResult<IndexHandle<T, K>>
    where
        K: Ord + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.add(name.into(), true, Arc::new(extract), Arc::new(K::cmp))
    }

    /// Declares a sorted-non-unique index keyed by `extract`.
    ///
    /// Elements with equal keys are kept contiguous, in arrival order.
    pub fn ordered_non_unique<K, F>(
        &mut self,
        name: impl Into<String>,
        extract: F,
    ) -> CoreResult<IndexHandle<T, K>>
    where
        K: Ord + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.add(name.into(), false, Arc::new(extract), Arc::new(K::cmp))
    }

    /// Declares a sorted-unique index with an explicit key comparator.
    pub fn ordered_unique_by<K, F, C>(
        &mut self,
        name: impl Into<String>,
        extract: F,
        compare: C,
    ) -> CoreResult<IndexHandle<T, K>>
    where
        K: 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
        C: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        self.add(name.into(), true, Arc::new(extract), Arc::new(compare))
    }

    /// Declares a sorted-non-unique index with an explicit key comparator.
    pub fn ordered_non_unique_by<K, F, C>(
        &mut self,
        name: impl Into<String>,
        extract: F,
        compare: C,
    ) -> CoreResult<IndexHandle<T, K>>
    where
        K: 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
        C: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        self.add(name.into(), false, Arc::new(extract), Arc::new(compare))
    }

    fn add<K: 'static>(
        &mut self,
        name: String,
        unique: bool,
        extract: Arc<dyn Fn(&T) -> K + Send + Sync>,
        compare: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
    ) -> CoreResult<IndexHandle<T, K>> {
        if self.specs.iter().any(|spec| spec.name() == name) {
            return Err(CoreError::duplicate_index(name));
        }
        let id = IndexId::new(self.specs.len() as u32);
        let cmp = {
            let extract = Arc::clone(&extract);
            let compare = Arc::clone(&compare);
            Arc::new(move |a: &T, b: &T| (*compare)(&(*extract)(a), &(*extract)(b)))
        };
        self.specs.push(IndexSpec::new(name, unique, cmp));
        Ok(IndexHandle::new(id, extract, compare))
    }

    /// Builds the set. Fails if no index was declared.
    pub fn build(self) -> CoreResult<MultiIndexSet<T>> {
        if self.specs.is_empty() {
            return Err(CoreError::NoIndexes);
        }
        let tables = self.specs.iter().map(|_| LinkSet::new()).collect();
        Ok(MultiIndexSet {
            arena: Arena::new(),
            specs: self.specs,
            tables,
        })
    }
}

/// An element removed from every index but not destroyed.
///
/// The ownership-transfer token produced by [`MultiIndexSet::extract`] and
/// consumed by [`MultiIndexSet::insert_detached`]; lets an element move
/// between sets without reconstruction.
#[derive(Debug)]
pub struct Detached<T> {
    value: T,
}

impl<T> Detached<T> {
    /// Read access to the carried element.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwraps the carried element.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A collection maintaining several independent sorted orderings over one
/// shared element set.
///
/// Elements live in a generational arena; each declared index keeps its own
/// intrusive AVL link set over the same nodes. See the [module
/// documentation](self) for an example.
///
/// The set is single-threaded by design: operations are synchronous and
/// assume exclusive access. Callers needing concurrent access must
/// serialize externally.
pub struct MultiIndexSet<T: 'static> {
    pub(crate) arena: Arena<T>,
    pub(crate) specs: Vec<IndexSpec<T>>,
    pub(crate) tables: Vec<LinkSet>,
}

impl<T: 'static> MultiIndexSet<T> {
    /// Starts declaring a new set.
    #[must_use]
    pub fn builder() -> SetBuilder<T> {
        SetBuilder::new()
    }

    /// Number of elements in the set (identical across all indexes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// True if the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of declared indexes.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.specs.len()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts `value`, linking it into every index.
    ///
    /// Returns a cursor in the primary index and a success flag. On a
    /// unique-index conflict nothing is mutated, the flag is `false`, and
    /// the cursor points at the blocking element instead.
    pub fn insert(&mut self, value: T) -> (Cursor, bool) {
        match self.validate(&value) {
            Ok(placements) => {
                let node = self.arena.insert(value);
                self.link_everywhere(node, &placements);
                trace!(node = ?node, "inserted element");
                (Cursor::new(IndexId::PRIMARY, Some(node)), true)
            }
            Err((index, blocking)) => {
                debug!(index = %self.specs[index.as_usize()].name(), "insert rejected by unique index");
                (Cursor::new(IndexId::PRIMARY, Some(blocking)), false)
            }
        }
    }

    /// Inserts `value`, reporting a unique-index conflict as an error.
    ///
    /// Result-flavored variant of [`Self::insert`] for callers that treat a
    /// duplicate as a failure rather than a lookup result. The error names
    /// the index that rejected the key; nothing is mutated on failure.
    pub fn try_insert(&mut self, value: T) -> CoreResult<Cursor> {
        match self.validate(&value) {
            Ok(placements) => {
                let node = self.arena.insert(value);
                self.link_everywhere(node, &placements);
                Ok(Cursor::new(IndexId::PRIMARY, Some(node)))
            }
            Err((index, _blocking)) => Err(CoreError::duplicate_key(
                self.specs[index.as_usize()].name(),
            )),
        }
    }

    /// Builds an element with `make` and inserts it.
    ///
    /// The construct-then-insert analog of in-place emplacement; the
    /// element is validated against every index before any tree is touched,
    /// exactly as [`Self::insert`].
    pub fn insert_with(&mut self, make: impl FnOnce() -> T) -> (Cursor, bool) {
        self.insert(make())
    }

    /// Re-inserts a previously extracted element.
    ///
    /// On success the handle is consumed. On a unique-index conflict the
    /// handle is returned so the caller keeps ownership of the element.
    pub fn insert_detached(&mut self, detached: Detached<T>) -> (Cursor, bool, Option<Detached<T>>) {
        match self.validate(detached.value()) {
            Ok(placements) => {
                let node = self.arena.insert(detached.into_value());
                self.link_everywhere(node, &placements);
                (Cursor::new(IndexId::PRIMARY, Some(node)), true, None)
            }
            Err((index, blocking)) => {
                debug!(index = %self.specs[index.as_usize()].name(), "detached insert rejected");
                (
                    Cursor::new(IndexId::PRIMARY, Some(blocking)),
                    false,
                    Some(detached),
                )
            }
        }
    }

    /// Erases the element at `cursor` from every index.
    ///
    /// Returns the cursor to the next element in the same index's order.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is the end sentinel or stale.
    pub fn erase(&mut self, cursor: Cursor) -> Cursor {
        let node = self.require_node(cursor);
        let next = self.tables[cursor.index().as_usize()].successor(node);
        self.unlink_everywhere(node);
        drop(self.arena.remove(node));
        Cursor::new(cursor.index(), next)
    }

    /// Erases every element matching `key` in the handle's index.
    ///
    /// Returns the number of elements removed; more than one only under a
    /// non-unique policy. Each removal fans out to all indexes.
    pub fn erase_key<K: 'static>(&mut self, handle: &IndexHandle<T, K>, key: &K) -> usize {
        let matches = self.collect_equal(handle, key);
        for &node in &matches {
            self.unlink_everywhere(node);
            drop(self.arena.remove(node));
        }
        matches.len()
    }

    /// Removes the element at `cursor` from every index without destroying
    /// it, transferring ownership to the caller.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is the end sentinel or stale.
    pub fn extract(&mut self, cursor: Cursor) -> Detached<T> {
        let node = self.require_node(cursor);
        self.unlink_everywhere(node);
        Detached {
            value: self.arena.remove(node),
        }
    }

    /// Applies an in-place edit and re-checks every index's ordering.
    ///
    /// For each index, the edited element is compared against its immediate
    /// neighbors; if its position still satisfies the ordering the index is
    /// untouched, otherwise the element is detached and re-inserted at its
    /// new position in that index only. If re-insertion collides in a
    /// unique index the element is removed from the whole set and `false`
    /// is returned; cursors to it become stale.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is the end sentinel or stale.
    pub fn modify(&mut self, cursor: Cursor, edit: impl FnOnce(&mut T)) -> bool {
        let node = self.require_node(cursor);
        edit(self.arena.get_mut(node).unwrap());

        for i in 0..self.tables.len() {
            let index = IndexId::new(i as u32);
            if self.in_place(index, node) {
                continue;
            }
            self.tables[i].unlink(node);
            let placement = {
                let spec = &self.specs[i];
                let value = self.arena.resolve(node);
                self.tables[i].locate(
                    &self.arena,
                    |a: &T, b: &T| spec.compare(a, b),
                    spec.unique(),
                    value,
                )
            };
            match placement {
                Ok(at) => {
                    trace!(index = %self.specs[i].name(), "resorted element after modify");
                    self.tables[i].attach_leaf(node, at);
                }
                Err(_blocking) => {
                    debug!(
                        index = %self.specs[i].name(),
                        "modify broke uniqueness; removing element"
                    );
                    for (j, table) in self.tables.iter_mut().enumerate() {
                        if j != i {
                            table.unlink(node);
                        }
                    }
                    drop(self.arena.remove(node));
                    return false;
                }
            }
        }
        true
    }

    /// Removes every element and resets all indexes.
    pub fn clear(&mut self) {
        let count = self.arena.len();
        for table in &mut self.tables {
            table.clear();
        }
        self.arena.clear();
        if count > 0 {
            debug!(count, "cleared multi-index set");
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Finds an element by key in the handle's index.
    ///
    /// The returned cursor is the end sentinel when no element matches.
    /// Under a non-unique policy, any element of the equal run may be
    /// returned; use [`Self::lower_bound`] for the first.
    #[must_use]
    pub fn find<K: 'static>(&self, handle: &IndexHandle<T, K>, key: &K) -> Cursor {
        let table = &self.tables[handle.id().as_usize()];
        let node = table.find(&self.arena, |element| handle.probe(key, element));
        Cursor::new(handle.id(), node)
    }

    /// Cursor to the first element whose key is not less than `key`.
    #[must_use]
    pub fn lower_bound<K: 'static>(&self, handle: &IndexHandle<T, K>, key: &K) -> Cursor {
        let table = &self.tables[handle.id().as_usize()];
        let node = table.lower_bound(&self.arena, |element| handle.probe(key, element));
        Cursor::new(handle.id(), node)
    }

    /// Cursor to the first element whose key is strictly greater than `key`.
    #[must_use]
    pub fn upper_bound<K: 'static>(&self, handle: &IndexHandle<T, K>, key: &K) -> Cursor {
        let table = &self.tables[handle.id().as_usize()];
        let node = table.upper_bound(&self.arena, |element| handle.probe(key, element));
        Cursor::new(handle.id(), node)
    }

    /// Number of elements matching `key` in the handle's index.
    #[must_use]
    pub fn count<K: 'static>(&self, handle: &IndexHandle<T, K>, key: &K) -> usize {
        self.collect_equal(handle, key).len()
    }

    /// Iterates the elements whose keys fall within `bounds`, in the
    /// handle's index order.
    pub fn range<K, R>(&self, handle: &IndexHandle<T, K>, bounds: R) -> Range<'_, T>
    where
        K: 'static,
        R: RangeBounds<K>,
    {
        let table = &self.tables[handle.id().as_usize()];

        // An inverted range yields nothing rather than walking to the end.
        if let (
            Bound::Included(s) | Bound::Excluded(s),
            Bound::Included(e) | Bound::Excluded(e),
        ) = (bounds.start_bound(), bounds.end_bound())
        {
            if handle.compare_keys(s, e) == Ordering::Greater {
                return Range::new(table, &self.arena, None, None);
            }
        }

        let start = match bounds.start_bound() {
            Bound::Unbounded => table.first(),
            Bound::Included(key) => {
                table.lower_bound(&self.arena, |element| handle.probe(key, element))
            }
            Bound::Excluded(key) => {
                table.upper_bound(&self.arena, |element| handle.probe(key, element))
            }
        };
        let stop = match bounds.end_bound() {
            Bound::Unbounded => None,
            Bound::Included(key) => {
                table.upper_bound(&self.arena, |element| handle.probe(key, element))
            }
            Bound::Excluded(key) => {
                table.lower_bound(&self.arena, |element| handle.probe(key, element))
            }
        };
        Range::new(table, &self.arena, start, stop)
    }

    // ------------------------------------------------------------------
    // Cursors
    // ------------------------------------------------------------------

    /// Read access to the element at `cursor`; `None` at the end sentinel.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is stale (its element was erased).
    #[must_use]
    pub fn get(&self, cursor: Cursor) -> Option<&T> {
        cursor.node().map(|node| {
            assert!(self.arena.contains(node), "cursor used after erase");
            self.arena.resolve(node)
        })
    }

    /// Cursor to the first element of `index`'s order.
    #[must_use]
    pub fn begin(&self, index: IndexId) -> Cursor {
        Cursor::new(index, self.tables[index.as_usize()].first())
    }

    /// The end sentinel of `index`.
    #[must_use]
    pub fn end(&self, index: IndexId) -> Cursor {
        Cursor::new(index, None)
    }

    /// Cursor to the in-order successor of `cursor`'s element.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is the end sentinel or stale.
    #[must_use]
    pub fn next(&self, cursor: Cursor) -> Cursor {
        let node = self.require_node(cursor);
        let next = self.tables[cursor.index().as_usize()].successor(node);
        Cursor::new(cursor.index(), next)
    }

    /// Cursor to the in-order predecessor of `cursor`'s element.
    ///
    /// Retreating from the end sentinel yields the last element.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is stale, or when retreating past the first
    /// element.
    #[must_use]
    pub fn prev(&self, cursor: Cursor) -> Cursor {
        let table = &self.tables[cursor.index().as_usize()];
        let prev = match cursor.node() {
            None => table.last(),
            Some(node) => {
                assert!(self.arena.contains(node), "cursor used after erase");
                table.predecessor(node)
            }
        };
        match prev {
            Some(node) => Cursor::new(cursor.index(), Some(node)),
            None => panic!("cannot retreat past the first element"),
        }
    }

    /// Re-aims `cursor` at the same element through `target`'s ordering.
    ///
    /// The end sentinel projects to `target`'s end sentinel.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is stale.
    #[must_use]
    pub fn project(&self, cursor: Cursor, target: IndexId) -> Cursor {
        match cursor.node() {
            None => Cursor::new(target, None),
            Some(node) => {
                assert!(self.arena.contains(node), "cursor used after erase");
                Cursor::new(target, Some(node))
            }
        }
    }

    /// Iterates `index`'s full sorted order.
    pub fn iter(&self, index: IndexId) -> Iter<'_, T> {
        Iter::new(&self.tables[index.as_usize()], &self.arena)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolves a cursor to its live node, failing fast on misuse.
    fn require_node(&self, cursor: Cursor) -> NodeId {
        let node = cursor
            .node()
            .unwrap_or_else(|| panic!("end-sentinel cursor cannot be dereferenced"));
        assert!(self.arena.contains(node), "cursor used after erase");
        node
    }

    /// Finds a placement in every index without mutating any of them.
    ///
    /// On a unique conflict, reports the index and the blocking node; no
    /// tree has been touched at that point.
    fn validate(&self, value: &T) -> Result<Vec<Placement>, (IndexId, NodeId)> {
        let mut placements = Vec::with_capacity(self.specs.len());
        for (i, (spec, table)) in self.specs.iter().zip(&self.tables).enumerate() {
            match table.locate(
                &self.arena,
                |a: &T, b: &T| spec.compare(a, b),
                spec.unique(),
                value,
            ) {
                Ok(placement) => placements.push(placement),
                Err(blocking) => return Err((IndexId::new(i as u32), blocking)),
            }
        }
        Ok(placements)
    }

    /// Links a fresh node into every index at its precomputed placement.
    ///
    /// Valid only immediately after [`Self::validate`], with no mutation in
    /// between.
    fn link_everywhere(&mut self, node: NodeId, placements: &[Placement]) {
        for (table, &placement) in self.tables.iter_mut().zip(placements) {
            table.ensure_slot(node.slot());
            table.attach_leaf(node, placement);
        }
    }

    fn unlink_everywhere(&mut self, node: NodeId) {
        for table in &mut self.tables {
            table.unlink(node);
        }
    }

    /// True if `node`'s position in `index` still satisfies the ordering
    /// relative to its immediate neighbors.
    fn in_place(&self, index: IndexId, node: NodeId) -> bool {
        let table = &self.tables[index.as_usize()];
        let spec = &self.specs[index.as_usize()];
        let value = self.arena.resolve(node);

        if let Some(prev) = table.predecessor(node) {
            match spec.compare(self.arena.resolve(prev), value) {
                Ordering::Greater => return false,
                Ordering::Equal if spec.unique() => return false,
                _ => {}
            }
        }
        if let Some(next) = table.successor(node) {
            match spec.compare(value, self.arena.resolve(next)) {
                Ordering::Greater => return false,
                Ordering::Equal if spec.unique() => return false,
                _ => {}
            }
        }
        true
    }

    /// Collects the nodes whose keys equal `key` in the handle's index, in
    /// sorted order.
    fn collect_equal<K: 'static>(&self, handle: &IndexHandle<T, K>, key: &K) -> Vec<NodeId> {
        let table = &self.tables[handle.id().as_usize()];
        let mut matches = Vec::new();
        let mut cur = table.lower_bound(&self.arena, |element| handle.probe(key, element));
        while let Some(node) = cur {
            if handle.probe(key, self.arena.resolve(node)) != Ordering::Equal {
                break;
            }
            matches.push(node);
            cur = table.successor(node);
        }
        matches
    }
}

impl<T: 'static + std::fmt::Debug> std::fmt::Debug for MultiIndexSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiIndexSet")
            .field("len", &self.len())
            .field("indexes", &self.specs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: u64,
        rank: i64,
    }

    fn entry(id: u64, rank: i64) -> Entry {
        Entry { id, rank }
    }

    struct Fixture {
        set: MultiIndexSet<Entry>,
        by_id: IndexHandle<Entry, u64>,
        by_rank: IndexHandle<Entry, i64>,
    }

    fn fixture() -> Fixture {
        let mut builder = MultiIndexSet::builder();
        let by_id = builder.ordered_unique("id", |e: &Entry| e.id).unwrap();
        let by_rank = builder
            .ordered_non_unique("rank", |e: &Entry| e.rank)
            .unwrap();
        Fixture {
            set: builder.build().unwrap(),
            by_id,
            by_rank,
        }
    }

    fn ids_by(fx: &Fixture, index: IndexId) -> Vec<u64> {
        fx.set.iter(index).map(|e| e.id).collect()
    }

    #[test]
    fn builder_rejects_duplicate_names_and_empty_sets() {
        let mut builder = MultiIndexSet::builder();
        builder.ordered_unique("id", |e: &Entry| e.id).unwrap();
        let err = builder.ordered_non_unique("id", |e: &Entry| e.rank);
        assert!(matches!(err, Err(CoreError::DuplicateIndex { .. })));

        let empty: SetBuilder<Entry> = MultiIndexSet::builder();
        assert!(matches!(empty.build(), Err(CoreError::NoIndexes)));
    }

    #[test]
    fn insert_links_into_every_index() {
        let mut fx = fixture();
        for (id, rank) in [(1, 30), (2, 10), (3, 20)] {
            let (_, ok) = fx.set.insert(entry(id, rank));
            assert!(ok);
        }

        assert_eq!(fx.set.len(), 3);
        assert_eq!(ids_by(&fx, fx.by_id.id()), vec![1, 2, 3]);
        assert_eq!(ids_by(&fx, fx.by_rank.id()), vec![2, 3, 1]);
    }

    #[test]
    fn duplicate_insert_is_all_or_nothing() {
        let mut fx = fixture();
        fx.set.insert(entry(1, 10));
        let (blocking, ok) = fx.set.insert(entry(1, 99));

        assert!(!ok);
        assert_eq!(fx.set.len(), 1);
        // The blocking cursor addresses the existing, unchanged element.
        assert_eq!(fx.set.get(blocking).unwrap(), &entry(1, 10));
        // The rank index was never touched by the rejected candidate.
        assert_eq!(fx.set.count(&fx.by_rank, &99), 0);
    }

    #[test]
    fn try_insert_names_the_rejecting_index() {
        let mut fx = fixture();
        fx.set.try_insert(entry(1, 10)).unwrap();

        let err = fx.set.try_insert(entry(1, 20)).unwrap_err();
        match err {
            CoreError::DuplicateKey { index } => assert_eq!(index, "id"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.set.len(), 1);
    }

    #[test]
    fn find_and_bounds() {
        let mut fx = fixture();
        for (id, rank) in [(1, 10), (2, 20), (3, 20), (4, 30)] {
            fx.set.insert(entry(id, rank));
        }

        assert!(fx.set.find(&fx.by_id, &9).is_end());
        assert_eq!(fx.set.get(fx.set.find(&fx.by_id, &3)).unwrap().id, 3);

        let lb = fx.set.lower_bound(&fx.by_rank, &20);
        assert_eq!(fx.set.get(lb).unwrap().id, 2);
        let ub = fx.set.upper_bound(&fx.by_rank, &20);
        assert_eq!(fx.set.get(ub).unwrap().id, 4);

        assert_eq!(fx.set.count(&fx.by_rank, &20), 2);
        assert_eq!(fx.set.count(&fx.by_rank, &15), 0);
    }

    #[test]
    fn range_queries() {
        let mut fx = fixture();
        for (id, rank) in [(1, 10), (2, 20), (3, 30), (4, 40)] {
            fx.set.insert(entry(id, rank));
        }

        let ids: Vec<u64> = fx.set.range(&fx.by_rank, 20..=30).map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let ids: Vec<u64> = fx.set.range(&fx.by_rank, ..20).map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);

        let ids: Vec<u64> = fx.set.range(&fx.by_rank, 35..).map(|e| e.id).collect();
        assert_eq!(ids, vec![4]);

        #[allow(clippy::reversed_empty_ranges)]
        let inverted: Vec<u64> = fx.set.range(&fx.by_rank, 30..10).map(|e| e.id).collect();
        assert!(inverted.is_empty());
    }

    #[test]
    fn erase_returns_next_cursor_in_same_index() {
        let mut fx = fixture();
        for (id, rank) in [(1, 30), (2, 10), (3, 20)] {
            fx.set.insert(entry(id, rank));
        }

        // In rank order: 2 (10), 3 (20), 1 (30). Erasing 3 yields 1.
        let cur = fx.set.find(&fx.by_rank, &20);
        let next = fx.set.erase(cur);
        assert_eq!(next.index(), fx.by_rank.id());
        assert_eq!(fx.set.get(next).unwrap().id, 1);
        assert_eq!(fx.set.len(), 2);
        assert!(fx.set.find(&fx.by_id, &3).is_end());
    }

    #[test]
    fn erase_key_removes_all_duplicates() {
        let mut fx = fixture();
        for (id, rank) in [(1, 20), (2, 20), (3, 20), (4, 10)] {
            fx.set.insert(entry(id, rank));
        }

        assert_eq!(fx.set.erase_key(&fx.by_rank, &20), 3);
        assert_eq!(fx.set.len(), 1);
        assert_eq!(ids_by(&fx, fx.by_id.id()), vec![4]);
        assert_eq!(fx.set.erase_key(&fx.by_rank, &20), 0);
    }

    #[test]
    fn modify_in_place_keeps_position() {
        let mut fx = fixture();
        for (id, rank) in [(1, 10), (2, 20), (3, 30)] {
            fx.set.insert(entry(id, rank));
        }

        // 20 -> 25 stays between 10 and 30.
        let cur = fx.set.find(&fx.by_id, &2);
        assert!(fx.set.modify(cur, |e| e.rank = 25));
        assert_eq!(ids_by(&fx, fx.by_rank.id()), vec![1, 2, 3]);
        assert_eq!(fx.set.get(fx.set.find(&fx.by_id, &2)).unwrap().rank, 25);
    }

    #[test]
    fn modify_resorts_single_index() {
        let mut fx = fixture();
        for (id, rank) in [(1, 10), (2, 20), (3, 30)] {
            fx.set.insert(entry(id, rank));
        }

        // 10 -> 40 moves element 1 to the back of the rank order; the id
        // index is unaffected.
        let cur = fx.set.find(&fx.by_id, &1);
        assert!(fx.set.modify(cur, |e| e.rank = 40));
        assert_eq!(ids_by(&fx, fx.by_rank.id()), vec![2, 3, 1]);
        assert_eq!(ids_by(&fx, fx.by_id.id()), vec![1, 2, 3]);

        // The element is still reachable through both indexes.
        assert_eq!(fx.set.get(fx.set.find(&fx.by_rank, &40)).unwrap().id, 1);
    }

    #[test]
    fn modify_unique_collision_removes_element() {
        let mut fx = fixture();
        fx.set.insert(entry(1, 10));
        fx.set.insert(entry(2, 20));

        let cur = fx.set.find(&fx.by_id, &2);
        assert!(!fx.set.modify(cur, |e| e.id = 1));

        // The edited element is gone from every index; the survivor is
        // untouched.
        assert_eq!(fx.set.len(), 1);
        assert_eq!(fx.set.get(fx.set.find(&fx.by_id, &1)).unwrap().rank, 10);
        assert_eq!(fx.set.count(&fx.by_rank, &20), 0);
    }

    #[test]
    fn extract_and_reinsert() {
        let mut fx = fixture();
        fx.set.insert(entry(1, 10));
        fx.set.insert(entry(2, 20));

        let detached = fx.set.extract(fx.set.find(&fx.by_id, &1));
        assert_eq!(detached.value(), &entry(1, 10));
        assert_eq!(fx.set.len(), 1);
        assert!(fx.set.find(&fx.by_id, &1).is_end());

        let (cur, ok, leftover) = fx.set.insert_detached(detached);
        assert!(ok);
        assert!(leftover.is_none());
        assert_eq!(fx.set.get(cur).unwrap().id, 1);
        assert_eq!(fx.set.len(), 2);
    }

    #[test]
    fn rejected_detached_insert_returns_handle() {
        let mut fx = fixture();
        fx.set.insert(entry(1, 10));

        let detached = fx.set.extract(fx.set.find(&fx.by_id, &1));
        fx.set.insert(entry(1, 99));

        let (blocking, ok, leftover) = fx.set.insert_detached(detached);
        assert!(!ok);
        assert_eq!(fx.set.get(blocking).unwrap().rank, 99);
        assert_eq!(leftover.unwrap().into_value(), entry(1, 10));
        assert_eq!(fx.set.len(), 1);
    }

    #[test]
    fn project_reaims_cursor() {
        let mut fx = fixture();
        for (id, rank) in [(1, 30), (2, 10)] {
            fx.set.insert(entry(id, rank));
        }

        let in_id = fx.set.find(&fx.by_id, &1);
        let in_rank = fx.set.project(in_id, fx.by_rank.id());
        assert_eq!(in_rank.index(), fx.by_rank.id());
        assert_eq!(fx.set.get(in_rank).unwrap().id, 1);
        // Element 1 has the highest rank, so it is last in rank order.
        assert!(fx.set.next(in_rank).is_end());

        let end = fx.set.end(fx.by_id.id());
        assert!(fx.set.project(end, fx.by_rank.id()).is_end());
    }

    #[test]
    fn cursor_walk_matches_iter() {
        let mut fx = fixture();
        for (id, rank) in [(5, 50), (1, 10), (3, 30), (2, 20), (4, 40)] {
            fx.set.insert(entry(id, rank));
        }

        let mut walked = Vec::new();
        let mut cur = fx.set.begin(fx.by_rank.id());
        while !cur.is_end() {
            walked.push(fx.set.get(cur).unwrap().id);
            cur = fx.set.next(cur);
        }
        let iterated: Vec<u64> = fx.set.iter(fx.by_rank.id()).map(|e| e.id).collect();
        assert_eq!(walked, iterated);

        // prev from the end sentinel lands on the maximum.
        let last = fx.set.prev(fx.set.end(fx.by_rank.id()));
        assert_eq!(fx.set.get(last).unwrap().id, 5);
    }

    #[test]
    fn clear_resets_every_index() {
        let mut fx = fixture();
        for (id, rank) in [(1, 10), (2, 20)] {
            fx.set.insert(entry(id, rank));
        }
        fx.set.clear();

        assert!(fx.set.is_empty());
        assert!(fx.set.begin(fx.by_id.id()).is_end());
        assert!(fx.set.begin(fx.by_rank.id()).is_end());
        fx.set.insert(entry(7, 70));
        assert_eq!(fx.set.len(), 1);
    }

    #[test]
    #[should_panic(expected = "cursor used after erase")]
    fn stale_cursor_fails_fast() {
        let mut fx = fixture();
        fx.set.insert(entry(1, 10));
        let cur = fx.set.find(&fx.by_id, &1);
        fx.set.erase(cur);
        let _ = fx.set.get(cur);
    }

    #[test]
    #[should_panic(expected = "end-sentinel cursor")]
    fn advancing_end_sentinel_fails_fast() {
        let fx = fixture();
        let _ = fx.set.next(fx.set.end(fx.by_id.id()));
    }

    #[test]
    fn custom_comparator_orders_descending() {
        let mut builder = MultiIndexSet::builder();
        let by_rank_desc = builder
            .ordered_non_unique_by("rank_desc", |e: &Entry| e.rank, |a, b| b.cmp(a))
            .unwrap();
        let mut set = builder.build().unwrap();
        for (id, rank) in [(1, 10), (2, 30), (3, 20)] {
            set.insert(entry(id, rank));
        }

        let ranks: Vec<i64> = set.iter(by_rank_desc.id()).map(|e| e.rank).collect();
        assert_eq!(ranks, vec![30, 20, 10]);
        assert_eq!(set.get(set.find(&by_rank_desc, &20)).unwrap().id, 3);
    }

    #[test]
    fn three_indexes_stay_coherent() {
        let mut builder = MultiIndexSet::builder();
        let by_id = builder.ordered_unique("id", |e: &Entry| e.id).unwrap();
        let by_rank = builder
            .ordered_non_unique("rank", |e: &Entry| e.rank)
            .unwrap();
        let by_sum = builder
            .ordered_non_unique("sum", |e: &Entry| e.id as i64 + e.rank)
            .unwrap();
        let mut set = builder.build().unwrap();

        for (id, rank) in [(4, 1), (1, 9), (3, 3), (2, 2)] {
            set.insert(entry(id, rank));
        }
        set.erase_key(&by_rank, &3);

        let mut views: Vec<Vec<u64>> = Vec::new();
        for index in [by_id.id(), by_rank.id(), by_sum.id()] {
            let mut ids: Vec<u64> = set.iter(index).map(|e| e.id).collect();
            ids.sort_unstable();
            views.push(ids);
        }
        assert_eq!(views[0], views[1]);
        assert_eq!(views[1], views[2]);
    }
}

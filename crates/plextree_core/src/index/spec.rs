//! Index declarations.
//!
//! An index is declared as a *value-level* capability: a name, a uniqueness
//! policy, and a comparator over elements (key extraction fused in). The
//! builder hands back a typed [`IndexHandle`] so key-based queries keep the
//! key type without the set itself being generic over every key.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Identifier of one ordering within a multi-index set.
///
/// Index IDs are assigned in declaration order; index `0` is the primary
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId(u32);

impl IndexId {
    /// The primary ordering: the first index declared on the builder.
    pub const PRIMARY: IndexId = IndexId(0);

    /// Creates an index ID.
    #[must_use]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "idx:{}", self.0)
    }
}

type ElementCmp<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
type KeyCmp<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;
type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Ordering policy for one index: name, uniqueness, element comparator.
pub(crate) struct IndexSpec<T: 'static> {
    name: String,
    unique: bool,
    cmp: ElementCmp<T>,
}

impl<T: 'static> IndexSpec<T> {
    pub(crate) fn new(name: String, unique: bool, cmp: ElementCmp<T>) -> Self {
        Self { name, unique, cmp }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn unique(&self) -> bool {
        self.unique
    }

    /// Compares two elements under this index's ordering.
    pub(crate) fn compare(&self, a: &T, b: &T) -> Ordering {
        (*self.cmp)(a, b)
    }
}

impl<T: 'static> fmt::Debug for IndexSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSpec")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .finish()
    }
}

/// Typed handle to one index of a [`MultiIndexSet`](crate::MultiIndexSet).
///
/// Returned when the index is declared on the builder; carries the key
/// extractor and key comparator so `find`/`lower_bound`/`count`-style
/// queries take the key type the index was declared with. Handles are cheap
/// to clone and remain valid for the lifetime of the set they were built
/// for.
pub struct IndexHandle<T: 'static, K: 'static> {
    id: IndexId,
    extract: KeyFn<T, K>,
    compare: KeyCmp<K>,
}

impl<T: 'static, K: 'static> IndexHandle<T, K> {
    pub(crate) fn new(id: IndexId, extract: KeyFn<T, K>, compare: KeyCmp<K>) -> Self {
        Self {
            id,
            extract,
            compare,
        }
    }

    /// The ID of the index this handle refers to.
    #[must_use]
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Extracts this index's key from an element.
    #[must_use]
    pub fn key(&self, value: &T) -> K {
        (*self.extract)(value)
    }

    /// Compares a sought key against an element's extracted key.
    pub(crate) fn probe(&self, key: &K, element: &T) -> Ordering {
        (*self.compare)(key, &(*self.extract)(element))
    }

    /// Compares two keys under this index's comparator.
    pub(crate) fn compare_keys(&self, a: &K, b: &K) -> Ordering {
        (*self.compare)(a, b)
    }
}

impl<T: 'static, K: 'static> Clone for IndexHandle<T, K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            extract: Arc::clone(&self.extract),
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T: 'static, K: 'static> fmt::Debug for IndexHandle<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexHandle({})", self.id)
    }
}

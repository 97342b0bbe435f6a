//! # Plextree Core
//!
//! An in-memory, AVL-balanced, multi-ordering index engine.
//!
//! A [`MultiIndexSet`] keeps one owned element set and any number of
//! simultaneous sorted orderings over it. Each ordering is an intrusive
//! AVL tree: the per-index `{left, right, parent, balance}` links live in
//! parallel arrays addressed by the element's arena handle, so adding an
//! ordering never duplicates element storage.
//!
//! This crate provides:
//! - A generational node arena with fail-fast stale-handle detection
//! - A single-index AVL engine (search, bounds, insert and delete
//!   rebalancing, parent-link traversal)
//! - A multi-index coordinator with all-or-nothing insertion, fan-out
//!   erasure, and neighbor-checked in-place modification
//! - Cursors, iterators, and range queries per index
//! - A test-facing invariant checker
//!
//! The engine is single-threaded by design and performs no locking;
//! callers needing concurrent access must serialize externally.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod arena;
mod cursor;
mod error;
mod index;
mod set;
mod verify;

pub use arena::NodeId;
pub use cursor::{Cursor, Iter, Range};
pub use error::{CoreError, CoreResult};
pub use index::{IndexHandle, IndexId};
pub use set::{Detached, MultiIndexSet, SetBuilder};

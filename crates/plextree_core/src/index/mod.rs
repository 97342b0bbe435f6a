//! Index policies and the per-index tree engine.
//!
//! Each index of a multi-index set is one [`LinkSet`]: an AVL-balanced,
//! intrusive view over the shared node pool, driven by the ordering
//! capability declared in its [`IndexSpec`]. The engine here is policy-free;
//! uniqueness and comparison are supplied per call by the coordinator.

mod spec;
mod tree;

pub use spec::{IndexHandle, IndexId};

pub(crate) use spec::IndexSpec;
pub(crate) use tree::{LinkSet, Placement, Side};

//! # Plextree Testkit
//!
//! Test utilities for Plextree.
//!
//! This crate provides:
//! - The [`Order`](fixtures::Order) fixture element and a prebuilt
//!   three-index [`OrderBook`](fixtures::OrderBook)
//! - Property-based operation generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plextree_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_book() {
//!     let mut book = order_book();
//!     book.set.insert(order(1, "alice", 700));
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;

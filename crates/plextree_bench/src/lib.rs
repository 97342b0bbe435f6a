//! Benchmark support for Plextree.
//!
//! The measurable workloads live in `benches/`; this crate only hosts the
//! shared workload builders.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;

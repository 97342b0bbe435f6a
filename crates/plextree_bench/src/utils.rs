//! Shared workload builders for the benchmarks.

use plextree_core::{IndexHandle, MultiIndexSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Benchmark element: a unique ID plus a non-unique weight.
#[derive(Debug, Clone)]
pub struct Record {
    /// Unique key.
    pub id: u64,
    /// Non-unique key, mutated by the modify benchmarks.
    pub weight: i64,
}

/// A two-index set over [`Record`] plus its handles.
pub struct Workload {
    /// The set under measurement.
    pub set: MultiIndexSet<Record>,
    /// Unique index on [`Record::id`].
    pub by_id: IndexHandle<Record, u64>,
    /// Non-unique index on [`Record::weight`].
    pub by_weight: IndexHandle<Record, i64>,
}

/// Builds an empty two-index workload set.
#[must_use]
pub fn workload() -> Workload {
    let mut builder = MultiIndexSet::builder();
    let by_id = builder
        .ordered_unique("id", |r: &Record| r.id)
        .expect("fresh builder");
    let by_weight = builder
        .ordered_non_unique("weight", |r: &Record| r.weight)
        .expect("fresh builder");
    Workload {
        set: builder.build().expect("at least one index declared"),
        by_id,
        by_weight,
    }
}

/// Builds a workload prefilled with `n` records in shuffled key order.
#[must_use]
pub fn filled_workload(n: u64, seed: u64) -> Workload {
    let mut wl = workload();
    for id in shuffled_keys(n, seed) {
        wl.set.insert(Record {
            id,
            weight: (id as i64 * 31) % 1024,
        });
    }
    wl
}

/// The keys `0..n` in a deterministic shuffled order.
#[must_use]
pub fn shuffled_keys(n: u64, seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

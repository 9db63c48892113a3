//! Test partitioning and sharding
//!
//! Splits the declared test set into four disjoint execution groups and
//! shards lists across a bounded number of workers.

#![allow(dead_code)]

use tracing::debug;

use crate::models::TestSpec;

/// User overrides that collapse shared groups back toward single execution
#[derive(Clone, Copy, Debug, Default)]
pub struct PartitionOverrides {
    /// Disable parallel execution: parallel tests run single, parallel
    /// batched tests run batched
    pub no_parallel: bool,

    /// Disable batching: batched tests run single, parallel batched tests
    /// run parallel
    pub no_batch: bool,
}

/// The four disjoint execution groups of a suite
#[derive(Clone, Debug, Default)]
pub struct Partition {
    /// One process per test, never concurrent
    pub single: Vec<TestSpec>,

    /// Tests sharing one process sequentially
    pub batched: Vec<TestSpec>,

    /// One process per test, concurrently
    pub parallel: Vec<TestSpec>,

    /// Multiple concurrent processes, each running a sub-list sequentially
    pub parallel_batched: Vec<TestSpec>,
}

impl Partition {
    pub fn total(&self) -> usize {
        self.single.len() + self.batched.len() + self.parallel.len() + self.parallel_batched.len()
    }
}

/// Classify the declared tests into the four groups
///
/// `is_batchable` and `is_parallelizable` are independent booleans; a test
/// with neither set runs single. Overrides apply parallel-first, then batch,
/// each operating on the then-current groups, so disabling both collapses
/// everything into `single`.
pub fn partition(tests: Vec<TestSpec>, overrides: PartitionOverrides) -> Partition {
    let mut groups = Partition::default();
    for test in tests {
        match (test.batchable(), test.parallelizable()) {
            (false, false) => groups.single.push(test),
            (true, false) => groups.batched.push(test),
            (false, true) => groups.parallel.push(test),
            (true, true) => groups.parallel_batched.push(test),
        }
    }

    if overrides.no_parallel {
        groups.single.append(&mut groups.parallel);
        groups.batched.append(&mut groups.parallel_batched);
    }
    if overrides.no_batch {
        groups.single.append(&mut groups.batched);
        groups.parallel.append(&mut groups.parallel_batched);
    }

    debug!(
        "Partitioned suite: {} single, {} batched, {} parallel, {} parallel batched",
        groups.single.len(),
        groups.batched.len(),
        groups.parallel.len(),
        groups.parallel_batched.len()
    );
    groups
}

/// Split a list into contiguous chunks for at most `n` workers
///
/// Chunk size is `ceil(len / n)` with `n` clamped to at least 1; the
/// concatenation of the chunks is exactly the input. An empty input yields
/// no shards.
pub fn shard<T: Clone>(list: &[T], n: usize) -> Vec<Vec<T>> {
    if list.is_empty() {
        return Vec::new();
    }
    let n = n.max(1);
    let chunk_size = list.len().div_ceil(n);
    list.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

//! Parallel test execution
//!
//! Fans batches of tests out across worker threads, one OS thread per
//! concurrently running external process. Each worker owns a duplicated
//! launcher and its own [`ProcessRunner`], sends its result map over a
//! channel when done, and a single collector merges everything into the
//! shared result store after all workers in a wave have joined. There is no
//! cross-worker cancellation: one worker timing out never aborts the others.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use tracing::{error, info};

use crate::config::SuiteConfig;
use crate::launcher::{Launcher, Workspace};
use crate::models::{TestResult, TestSpec};
use crate::partition;
use crate::runner::ProcessRunner;
use crate::session::ResultStore;

type WorkerReport = (Vec<String>, anyhow::Result<HashMap<String, TestResult>>);

/// Coordinates waves of concurrent process runs
pub struct ParallelCoordinator<'a> {
    config: &'a SuiteConfig,
    workspace: &'a dyn Workspace,
}

impl<'a> ParallelCoordinator<'a> {
    pub fn new(config: &'a SuiteConfig, workspace: &'a dyn Workspace) -> Self {
        Self { config, workspace }
    }

    /// Run each test in its own process, at most `worker_count` at a time
    ///
    /// Tests beyond the worker bound are processed in successive waves
    /// reusing the same pool, never as unbounded fan-out.
    pub fn run_parallel(
        &self,
        prototype: &dyn Launcher,
        specs: &[TestSpec],
        store: &mut ResultStore,
    ) {
        if specs.is_empty() {
            return;
        }
        let workers = self.config.worker_count();
        info!(
            "Running {} parallel tests across up to {} workers",
            specs.len(),
            workers
        );

        for wave in specs.chunks(workers) {
            let (tx, rx) = mpsc::channel::<WorkerReport>();
            thread::scope(|scope| {
                for (index, spec) in wave.iter().enumerate() {
                    let tx = tx.clone();
                    let mut launcher = prototype.duplicate();
                    let run_id = (index + 1) as u32;
                    scope.spawn(move || {
                        let runner = ProcessRunner::new(self.config, self.workspace, run_id);
                        let outcome = runner.run_single(launcher.as_mut(), spec);
                        let _ = tx.send((vec![spec.name.clone()], outcome));
                    });
                }
            });
            drop(tx);
            self.merge_wave(rx, wave, store);
        }
    }

    /// Run contiguous sub-lists of tests, one batch process per worker
    pub fn run_parallel_batched(
        &self,
        prototype: &dyn Launcher,
        specs: &[TestSpec],
        store: &mut ResultStore,
    ) {
        if specs.is_empty() {
            return;
        }
        let workers = self.config.worker_count();
        let shards = partition::shard(specs, workers);
        info!(
            "Running {} batched tests across {} concurrent processes",
            specs.len(),
            shards.len()
        );

        let (tx, rx) = mpsc::channel::<WorkerReport>();
        thread::scope(|scope| {
            for (index, shard) in shards.iter().enumerate() {
                let tx = tx.clone();
                let mut launcher = prototype.duplicate();
                let run_id = (index + 1) as u32;
                scope.spawn(move || {
                    let runner = ProcessRunner::new(self.config, self.workspace, run_id);
                    let outcome = runner.run_batch(launcher.as_mut(), shard);
                    let assigned = shard.iter().map(|s| s.name.clone()).collect();
                    let _ = tx.send((assigned, outcome));
                });
            }
        });
        drop(tx);
        self.merge_wave(rx, specs, store);
    }

    /// Merge every worker's results for one wave into the shared store
    ///
    /// Runs strictly after the join barrier, so it is the only writer. A
    /// worker that reported nothing gets an `Unknown` synthesized for each
    /// of its assigned tests, keeping one result per submitted name.
    fn merge_wave(
        &self,
        rx: mpsc::Receiver<WorkerReport>,
        wave: &[TestSpec],
        store: &mut ResultStore,
    ) {
        let mut received: HashMap<String, TestResult> = HashMap::new();
        for (assigned, outcome) in rx.try_iter() {
            match outcome {
                Ok(results) if !results.is_empty() => {
                    received.extend(results);
                }
                Ok(_) => {
                    error!("Worker for {assigned:?} unexpectedly produced no results");
                }
                Err(err) => {
                    error!("Worker for {assigned:?} failed: {err:#}");
                }
            }
        }

        let mut any_failed = false;
        for spec in wave {
            let result = received.remove(&spec.name).unwrap_or_else(|| {
                TestResult::Unknown {
                    test_name: spec.name.clone(),
                    output: String::new(),
                    log: String::new(),
                    extra_info: "Worker produced no result for this test".to_string(),
                }
            });
            if !result.is_pass() {
                any_failed = true;
            }
            store.insert(result);
        }

        // Archive diagnostic assets once per wave, not once per failure.
        if any_failed {
            self.workspace.save_failed_asset_logs();
        }
    }
}

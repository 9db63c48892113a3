//! Session state and the two-phase suite protocol
//!
//! A session owns the shared result store and the lazily started asset
//! service for its whole lifetime; teardown stops the service and reaps
//! stray processes regardless of how the tests went.
//!
//! Suites run in two explicit phases. The execution phase partitions the
//! declared tests, runs every group and fills the store; the verification
//! phase is a separate step per test, run by the surrounding harness after
//! execution, which turns each stored result into pass or a typed failure.
//! A verification step for a grouped test errors rather than ever running
//! before its group executed.

#![allow(dead_code)]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::config::SuiteConfig;
use crate::error::HarnessError;
use crate::executor::ParallelCoordinator;
use crate::launcher::{AssetService, Launcher, Workspace};
use crate::models::{TestResult, TestSpec};
use crate::partition::{self, PartitionOverrides};
use crate::runner::ProcessRunner;

/// Process-lifetime mapping from test name to result
#[derive(Debug, Default)]
pub struct ResultStore {
    results: HashMap<String, TestResult>,
    started_at: Option<DateTime<Utc>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            started_at: Some(Utc::now()),
        }
    }

    /// Record one test's result; a name collision is an engine defect
    pub fn insert(&mut self, result: TestResult) {
        let name = result.test_name().to_string();
        let previous = self.results.insert(name.clone(), result);
        assert!(
            previous.is_none(),
            "duplicate result recorded for test '{name}'"
        );
    }

    pub fn merge(&mut self, results: HashMap<String, TestResult>) {
        for (_, result) in results {
            self.insert(result);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.get(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TestResult)> {
        self.results.iter()
    }

    pub fn passed(&self) -> usize {
        self.results.values().filter(|r| r.is_pass()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.results.len()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
}

/// Per-session shared state: the result store and the asset service handle
pub struct SessionData<'a> {
    workspace: &'a dyn Workspace,
    pub store: ResultStore,
    asset_service: Option<Box<dyn AssetService>>,
    torn_down: bool,
}

impl<'a> SessionData<'a> {
    pub fn new(workspace: &'a dyn Workspace) -> Self {
        Self {
            workspace,
            store: ResultStore::new(),
            asset_service: None,
            torn_down: false,
        }
    }

    /// Start the shared asset service on first need, reuse it afterwards
    ///
    /// On a start failure the tracked handle stays reset, so a later
    /// teardown never operates on a half-initialized service.
    pub fn ensure_asset_service(&mut self) -> Result<()> {
        let mut service = match self.asset_service.take() {
            Some(service) => service,
            None => {
                self.workspace.reap_stray_processes(true);
                self.workspace.asset_service()
            }
        };
        if !service.is_running() {
            service
                .start()
                .context("Failed to start the asset service")?;
        }
        self.asset_service = Some(service);
        Ok(())
    }

    pub fn asset_service_running(&self) -> bool {
        self.asset_service
            .as_ref()
            .map(|s| s.is_running())
            .unwrap_or(false)
    }

    /// Stop the service and reap stray processes; safe to call twice
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(mut service) = self.asset_service.take() {
            if let Err(err) = service.stop() {
                error!("Failed to stop asset service during teardown: {err:#}");
            }
            self.workspace.reap_stray_processes(true);
        } else {
            self.workspace.reap_stray_processes(false);
        }
    }
}

impl Drop for SessionData<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// How a run group executes its tests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One process running the whole list sequentially
    Batched,
    /// One process per test, concurrently
    Parallel,
    /// Multiple concurrent processes, each with a sequential sub-list
    ParallelBatched,
}

/// A named execution unit over a list of shared tests
///
/// Created at partition time and executed exactly once; the per-test result
/// checks that consume its outcome must never run before it executed.
#[derive(Debug)]
pub struct RunGroup {
    pub name: String,
    pub mode: RunMode,
    pub tests: Vec<TestSpec>,
    executed: bool,
}

impl RunGroup {
    fn new(name: &str, mode: RunMode, tests: Vec<TestSpec>) -> Self {
        Self {
            name: name.to_string(),
            mode,
            tests,
            executed: false,
        }
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    pub fn contains(&self, test_name: &str) -> bool {
        self.tests.iter().any(|t| t.name == test_name)
    }
}

/// The engine's entry point for the outer framework
///
/// Partitions the declared tests at construction, executes every group in
/// the execution phase, and answers per-test verification afterwards.
pub struct SuiteRunner<'a> {
    config: &'a SuiteConfig,
    workspace: &'a dyn Workspace,
    single: Vec<TestSpec>,
    groups: Vec<RunGroup>,
    singles_executed: bool,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(config: &'a SuiteConfig, workspace: &'a dyn Workspace, tests: Vec<TestSpec>) -> Self {
        let overrides = PartitionOverrides {
            no_parallel: config.no_parallel,
            no_batch: config.no_batch,
        };
        let groups = partition::partition(tests, overrides);
        Self {
            config,
            workspace,
            single: groups.single,
            groups: vec![
                RunGroup::new("batched", RunMode::Batched, groups.batched),
                RunGroup::new("parallel", RunMode::Parallel, groups.parallel),
                RunGroup::new(
                    "parallel_batched",
                    RunMode::ParallelBatched,
                    groups.parallel_batched,
                ),
            ],
            singles_executed: false,
        }
    }

    pub fn groups(&self) -> &[RunGroup] {
        &self.groups
    }

    /// Execution phase: run every single test and every group once
    pub fn execute_all(
        &mut self,
        prototype: &dyn Launcher,
        session: &mut SessionData<'_>,
    ) -> Result<()> {
        session.ensure_asset_service()?;
        self.execute_singles(prototype, session)?;
        for index in 0..self.groups.len() {
            self.execute_group(index, prototype, session)?;
        }
        info!(
            "Suite execution finished: {}/{} passed",
            session.store.passed(),
            session.store.len()
        );
        Ok(())
    }

    fn execute_singles(
        &mut self,
        prototype: &dyn Launcher,
        session: &mut SessionData<'_>,
    ) -> Result<()> {
        for spec in &self.single {
            self.workspace.reap_stray_processes(false);
            let mut launcher = prototype.duplicate();
            let runner = ProcessRunner::new(self.config, self.workspace, 1);
            let results = runner.run_single(launcher.as_mut(), spec)?;
            let passed = results.values().all(|r| r.is_pass());
            session.store.merge(results);
            if !passed {
                self.workspace.save_failed_asset_logs();
            }
        }
        self.singles_executed = true;
        Ok(())
    }

    /// Run one group; a group executes at most once per session
    pub fn execute_group(
        &mut self,
        index: usize,
        prototype: &dyn Launcher,
        session: &mut SessionData<'_>,
    ) -> Result<()> {
        let group = &mut self.groups[index];
        if group.executed {
            warn!("Group '{}' already executed, skipping", group.name);
            return Ok(());
        }
        group.executed = true;
        if group.tests.is_empty() {
            return Ok(());
        }
        info!("Executing group '{}' ({} tests)", group.name, group.tests.len());

        match group.mode {
            RunMode::Batched => {
                self.workspace.reap_stray_processes(false);
                let mut launcher = prototype.duplicate();
                let runner = ProcessRunner::new(self.config, self.workspace, 1);
                let results = runner.run_batch(launcher.as_mut(), &group.tests)?;
                let passed = results.values().all(|r| r.is_pass());
                session.store.merge(results);
                if !passed {
                    self.workspace.save_failed_asset_logs();
                }
            }
            RunMode::Parallel => {
                let coordinator = ParallelCoordinator::new(self.config, self.workspace);
                coordinator.run_parallel(prototype, &group.tests, &mut session.store);
            }
            RunMode::ParallelBatched => {
                let coordinator = ParallelCoordinator::new(self.config, self.workspace);
                coordinator.run_parallel_batched(prototype, &group.tests, &mut session.store);
            }
        }
        Ok(())
    }

    /// Verification phase: one check per test, after its group executed
    ///
    /// A missing entry for a submitted test is an engine defect, never
    /// coerced into a pass. Any non-pass result carries its full rendering.
    pub fn verify(
        &self,
        session: &SessionData<'_>,
        test_name: &str,
    ) -> std::result::Result<(), HarnessError> {
        if let Some(group) = self.groups.iter().find(|g| g.contains(test_name)) {
            if !group.executed {
                return Err(HarnessError::GroupNotExecuted {
                    group: group.name.clone(),
                    test: test_name.to_string(),
                });
            }
        }

        let result = session
            .store
            .get(test_name)
            .ok_or_else(|| HarnessError::MissingResult {
                name: test_name.to_string(),
            })?;

        if result.is_pass() {
            info!("Test {test_name}:\n{result}");
            Ok(())
        } else {
            Err(HarnessError::TestFailed {
                name: test_name.to_string(),
                report: result.to_string(),
            })
        }
    }
}

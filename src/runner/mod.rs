//! Process lifecycle for one run
//!
//! A [`ProcessRunner`] owns a single external process for the duration of
//! one run, whether that run covers one test or a batch sharing the process.
//! It builds the invocation, launches, waits with a timeout, persists the
//! run log as an artifact, drives crash-dump retrieval through the scoped
//! [`CrashReportSlot`], and hands the captured signals to the classifier.

#![allow(dead_code)]

pub mod crash;

pub use crash::CrashReportSlot;

use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::classifier;
use crate::config::SuiteConfig;
use crate::launcher::{Launcher, WaitError, Workspace};
use crate::models::{TestResult, TestSpec};
use crate::utils::Timer;

/// Runs one process per invocation, single test or shared batch
pub struct ProcessRunner<'a> {
    config: &'a SuiteConfig,
    workspace: &'a dyn Workspace,
    run_id: u32,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(config: &'a SuiteConfig, workspace: &'a dyn Workspace, run_id: u32) -> Self {
        Self {
            config,
            workspace,
            run_id,
        }
    }

    pub fn run_id(&self) -> u32 {
        self.run_id
    }

    /// Build the argument vector for an invocation over the given tests
    fn build_args(&self, launcher: &dyn Launcher, specs: &[TestSpec]) -> Vec<String> {
        let modules = specs
            .iter()
            .map(|s| launcher.resolve_module(&s.module_ref).display().to_string())
            .collect::<Vec<_>>()
            .join(";");

        let mut args = vec![
            "--run-test".to_string(),
            modules,
            "--logfile".to_string(),
            self.config.log_name.clone(),
            "--log-path".to_string(),
            self.workspace.log_path(self.run_id).display().to_string(),
        ];
        args.extend(self.config.global_args.iter().cloned());
        args.extend(self.config.feature_toggles.iter().cloned());

        // A lone test may override the suite renderer setting; a batch uses
        // the suite default and enables a debugger if any member asks.
        let null_renderer = match specs {
            [only] => only
                .use_null_renderer
                .unwrap_or(self.config.use_null_renderer),
            _ => self.config.use_null_renderer,
        };
        if null_renderer {
            args.push("--null-renderer".to_string());
        }
        if specs.iter().any(|s| s.attach_debugger) {
            args.push("--attach-debugger".to_string());
        }
        if specs.iter().any(|s| s.wait_for_debugger) {
            args.push("--wait-for-debugger".to_string());
        }
        if let [only] = specs {
            args.extend(only.extra_args.iter().cloned());
        }
        args
    }

    fn read_log(&self) -> String {
        self.workspace
            .read_run_log(self.run_id, &self.config.log_name)
            .unwrap_or_else(|err| {
                warn!("Could not read run log for run {}: {err}", self.run_id);
                String::new()
            })
    }

    /// Persist the run log as a named artifact, regardless of outcome
    fn archive_log(&self) {
        let path = self
            .workspace
            .log_path(self.run_id)
            .join(&self.config.log_name);
        let name = format!("({}){}", self.run_id, self.config.log_name);
        if let Err(err) = self.workspace.save_artifact(&path, &name) {
            warn!("Could not archive run log {name}: {err}");
        }
    }

    fn crash_grace(&self) -> Duration {
        Duration::from_secs(self.config.crash_grace_secs)
    }

    /// Run one test alone in one process
    pub fn run_single(
        &self,
        launcher: &mut dyn Launcher,
        spec: &TestSpec,
    ) -> Result<HashMap<String, TestResult>> {
        info!("Running test {} (run {})", spec.name, self.run_id);
        let slot = CrashReportSlot::claim(self.workspace, self.run_id);
        let specs = std::slice::from_ref(spec);
        let args = self.build_args(launcher, specs);
        launcher.args_mut().extend(args);

        let timer = Timer::start(format!("run {}", self.run_id));
        launcher.start()?;

        let results = match launcher.wait(spec.timeout()) {
            Ok(()) => {
                let output = launcher.output();
                let return_code = launcher.return_code().unwrap_or(-1);
                let log = self.read_log();
                self.archive_log();
                let grace = self.crash_grace();
                let mut probe = || slot.read(grace);
                classifier::classify_exit(specs, return_code, &output, &log, &mut probe)
            }
            Err(WaitError::Timeout(_)) => {
                // Cardinality is one, so no attribution pass is needed.
                let output = launcher.output();
                launcher.stop()?;
                let log = self.read_log();
                self.archive_log();
                let mut results = HashMap::new();
                results.insert(
                    spec.name.clone(),
                    TestResult::Timeout {
                        test_name: spec.name.clone(),
                        output,
                        log,
                        seconds: spec.timeout_secs,
                    },
                );
                results
            }
            Err(WaitError::Failed(msg)) => {
                launcher.stop()?;
                anyhow::bail!("wait on run {} failed: {msg}", self.run_id);
            }
        };

        info!(
            "Test {} finished in {}ms: {}",
            spec.name,
            timer.elapsed_ms(),
            results
                .get(&spec.name)
                .map(|r| r.status())
                .unwrap_or("UNKNOWN"),
        );
        Ok(results)
    }

    /// Run a batch of tests sequentially inside one process
    pub fn run_batch(
        &self,
        launcher: &mut dyn Launcher,
        specs: &[TestSpec],
    ) -> Result<HashMap<String, TestResult>> {
        info!(
            "Running batch of {} tests (run {})",
            specs.len(),
            self.run_id
        );
        let slot = CrashReportSlot::claim(self.workspace, self.run_id);
        let args = self.build_args(launcher, specs);
        launcher.args_mut().extend(args);

        let timer = Timer::start(format!("batch run {}", self.run_id));
        launcher.start()?;

        let shared_timeout = Duration::from_secs(self.config.shared_timeout_secs);
        let results = match launcher.wait(shared_timeout) {
            Ok(()) => {
                let output = launcher.output();
                let return_code = launcher.return_code().unwrap_or(-1);
                let log = self.read_log();
                self.archive_log();
                let grace = self.crash_grace();
                let mut probe = || slot.read(grace);
                classifier::classify_exit(specs, return_code, &output, &log, &mut probe)
            }
            Err(WaitError::Timeout(_)) => {
                launcher.stop()?;
                let output = launcher.output();
                let log = self.read_log();
                self.archive_log();
                classifier::classify_timeout(specs, &output, &log, self.config.shared_timeout_secs)
            }
            Err(WaitError::Failed(msg)) => {
                launcher.stop()?;
                anyhow::bail!("wait on batch run {} failed: {msg}", self.run_id);
            }
        };

        // A mismatch here is a scraper or attribution bug, never a test
        // failure; surface it immediately.
        assert_eq!(
            results.len(),
            specs.len(),
            "classifier produced {} results for {} submitted tests",
            results.len(),
            specs.len()
        );

        info!(
            "Batch run {} finished in {}ms, {}/{} passed",
            self.run_id,
            timer.elapsed_ms(),
            results.values().filter(|r| r.is_pass()).count(),
            specs.len()
        );
        Ok(results)
    }
}

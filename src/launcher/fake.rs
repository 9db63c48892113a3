//! Scripted collaborator fakes shared by the unit tests
//!
//! `FakeLauncher` emulates the launched application: at wait time it parses
//! the module list out of its own argument vector and emits one result
//! marker per completed test, honoring a scripted per-test behavior. The
//! test name is taken from the module path's file name, so tests should use
//! the test name as the module reference.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{AssetService, Launcher, WaitError, Workspace};

/// Scripted outcome for one test inside the fake application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakeBehavior {
    Pass,
    Fail,
    /// Process dies while this test runs; no marker is emitted for it
    Crash,
    /// Process never finishes while this test runs
    Hang,
}

/// Exit code the fake uses for crashes
pub const FAKE_CRASH_CODE: i32 = 0x8B;

#[derive(Clone)]
pub struct FakeLauncher {
    pub behaviors: Arc<HashMap<String, FakeBehavior>>,
    pub args: Vec<String>,
    output: String,
    return_code: Option<i32>,
    pub started: bool,
    pub stopped: bool,
}

impl FakeLauncher {
    pub fn new(behaviors: HashMap<String, FakeBehavior>) -> Self {
        Self {
            behaviors: Arc::new(behaviors),
            args: Vec::new(),
            output: String::new(),
            return_code: None,
            started: false,
            stopped: false,
        }
    }

    pub fn all_passing(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|n| (n.to_string(), FakeBehavior::Pass))
                .collect(),
        )
    }

    fn assigned_tests(&self) -> Vec<String> {
        let Some(pos) = self.args.iter().position(|a| a == "--run-test") else {
            return Vec::new();
        };
        let Some(joined) = self.args.get(pos + 1) else {
            return Vec::new();
        };
        joined
            .split(';')
            .map(|p| {
                Path::new(p)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    fn marker(name: &str, success: bool) -> String {
        format!(
            "JSON_START({{\"name\":\"{name}\",\"output\":\"ran {name}\",\"success\":{success}}})JSON_END"
        )
    }

    /// Simulate the run: emit markers in order, stop at a crash or hang
    fn simulate(&mut self) -> std::result::Result<(), WaitError> {
        let mut lines = Vec::new();
        let mut code = 0;
        for name in self.assigned_tests() {
            match self.behaviors.get(&name).copied().unwrap_or(FakeBehavior::Pass) {
                FakeBehavior::Pass => lines.push(Self::marker(&name, true)),
                FakeBehavior::Fail => {
                    lines.push(Self::marker(&name, false));
                    code = crate::classifier::FAIL_EXIT_CODE;
                }
                FakeBehavior::Crash => {
                    self.output = lines.join("\n");
                    self.return_code = Some(FAKE_CRASH_CODE);
                    return Ok(());
                }
                FakeBehavior::Hang => {
                    self.output = lines.join("\n");
                    return Err(WaitError::Timeout(Duration::from_secs(0)));
                }
            }
        }
        self.output = lines.join("\n");
        self.return_code = Some(code);
        Ok(())
    }
}

impl Launcher for FakeLauncher {
    fn args_mut(&mut self) -> &mut Vec<String> {
        &mut self.args
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn wait(&mut self, _timeout: Duration) -> std::result::Result<(), WaitError> {
        self.simulate()
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        Ok(())
    }

    fn output(&self) -> String {
        self.output.clone()
    }

    fn return_code(&self) -> Option<i32> {
        self.return_code
    }

    fn resolve_module(&self, module_ref: &str) -> PathBuf {
        PathBuf::from(module_ref)
    }

    fn duplicate(&self) -> Box<dyn Launcher> {
        Box::new(Self {
            behaviors: self.behaviors.clone(),
            args: Vec::new(),
            output: String::new(),
            return_code: None,
            started: false,
            stopped: false,
        })
    }
}

#[derive(Default)]
pub struct FakeWorkspace {
    pub run_logs: Mutex<HashMap<(u32, String), String>>,
    pub artifacts: Mutex<Vec<String>>,
    pub crash_report: Mutex<Option<String>>,
    /// Dump that "appears" during the run: returned by polls once the
    /// claimed slot itself is empty, surviving claim-time resets
    pub pending_crash_report: Mutex<Option<String>>,
    pub crash_resets: AtomicUsize,
    pub failed_asset_saves: AtomicUsize,
    pub reaps: AtomicUsize,
    pub service_running: Arc<AtomicBool>,
    pub service_fails_to_start: bool,
}

impl FakeWorkspace {
    pub fn with_crash_report(report: &str) -> Self {
        let ws = Self::default();
        *ws.crash_report.lock().unwrap() = Some(report.to_string());
        ws
    }

    pub fn set_run_log(&self, run_id: u32, log_name: &str, content: &str) {
        self.run_logs
            .lock()
            .unwrap()
            .insert((run_id, log_name.to_string()), content.to_string());
    }
}

impl Workspace for FakeWorkspace {
    fn log_path(&self, run_id: u32) -> PathBuf {
        PathBuf::from(format!("/fake/logs/{run_id}"))
    }

    fn read_run_log(&self, run_id: u32, log_name: &str) -> Result<String> {
        Ok(self
            .run_logs
            .lock()
            .unwrap()
            .get(&(run_id, log_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn save_artifact(&self, _path: &PathBuf, artifact_name: &str) -> Result<()> {
        self.artifacts.lock().unwrap().push(artifact_name.to_string());
        Ok(())
    }

    fn crash_report_path(&self, run_id: u32) -> PathBuf {
        PathBuf::from(format!("/fake/logs/{run_id}/crash.log"))
    }

    fn poll_crash_report(&self, _run_id: u32, _wait: Duration) -> Option<String> {
        let slot = self.crash_report.lock().unwrap().clone();
        slot.or_else(|| self.pending_crash_report.lock().unwrap().take())
    }

    fn reset_crash_report(&self, _run_id: u32) {
        *self.crash_report.lock().unwrap() = None;
        self.crash_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn save_failed_asset_logs(&self) {
        self.failed_asset_saves.fetch_add(1, Ordering::SeqCst);
    }

    fn reap_stray_processes(&self, _include_asset_service: bool) {
        self.reaps.fetch_add(1, Ordering::SeqCst);
    }

    fn asset_service(&self) -> Box<dyn AssetService> {
        Box::new(FakeAssetService {
            running: self.service_running.clone(),
            fails_to_start: self.service_fails_to_start,
        })
    }
}

pub struct FakeAssetService {
    running: Arc<AtomicBool>,
    fails_to_start: bool,
}

impl AssetService for FakeAssetService {
    fn start(&mut self) -> Result<()> {
        if self.fails_to_start {
            anyhow::bail!("asset service refused to start");
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

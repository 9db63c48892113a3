//! External collaborator interfaces
//!
//! The engine never launches binaries or touches the filesystem layout
//! itself; it drives three collaborators owned by the surrounding framework:
//! the application [`Launcher`], the shared background [`AssetService`], and
//! the [`Workspace`] that resolves paths and archives artifacts.

#![allow(dead_code)]

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
pub(crate) mod fake;

/// Error from waiting on a launched process
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Process did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Wait failed: {0}")]
    Failed(String),
}

/// Handle to one externally launched application instance
///
/// A launcher is configured once (working directory, settings) by the outer
/// framework; the engine only appends per-run arguments, starts it, waits
/// and collects output. `duplicate` yields a fresh, unstarted instance with
/// the same configuration so parallel workers never share process state.
pub trait Launcher: Send {
    /// The argument vector the process will be started with
    fn args_mut(&mut self) -> &mut Vec<String>;

    /// Start the process
    fn start(&mut self) -> Result<()>;

    /// Block until the process exits, up to the given budget
    fn wait(&mut self, timeout: Duration) -> std::result::Result<(), WaitError>;

    /// Stop the process if it is still running
    fn stop(&mut self) -> Result<()>;

    /// Everything the process wrote to stdout so far
    fn output(&self) -> String;

    /// The exit code, if the process has exited
    fn return_code(&self) -> Option<i32>;

    /// Resolve an opaque test module reference to an on-disk path
    fn resolve_module(&self, module_ref: &str) -> PathBuf;

    /// A fresh unstarted instance with the same launch configuration
    fn duplicate(&self) -> Box<dyn Launcher>;
}

/// Shared background asset-compilation service
///
/// Process-wide: started lazily on first need, reused for the whole session,
/// and stopped only by session teardown. Workers may read its readiness
/// concurrently but never stop or restart it mid-session.
pub trait AssetService: Send {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// Path resolution, artifact archival and crash-report access
pub trait Workspace: Sync {
    /// Directory holding the given run's log files
    fn log_path(&self, run_id: u32) -> PathBuf;

    /// Contents of the named log for the given run; empty if missing
    fn read_run_log(&self, run_id: u32, log_name: &str) -> Result<String>;

    /// Archive a file under the given artifact name
    fn save_artifact(&self, path: &PathBuf, artifact_name: &str) -> Result<()>;

    /// Path where the runtime drops a crash dump for the given run
    fn crash_report_path(&self, run_id: u32) -> PathBuf;

    /// Poll for a crash dump for the given run, up to `wait`
    ///
    /// Returns the dump text if one appeared within the budget.
    fn poll_crash_report(&self, run_id: u32, wait: Duration) -> Option<String>;

    /// Reset the crash-report slot so a stale dump never leaks into a later run
    fn reset_crash_report(&self, run_id: u32);

    /// Archive asset-processing logs that contain errors or warnings
    fn save_failed_asset_logs(&self);

    /// Kill leftover application processes from earlier runs
    fn reap_stray_processes(&self, include_asset_service: bool);

    /// Construct the session's asset service
    fn asset_service(&self) -> Box<dyn AssetService>;
}

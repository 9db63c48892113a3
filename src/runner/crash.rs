//! Crash-report slot handling
//!
//! The runtime drops at most one crash dump per run at a known path. The
//! slot is claimed for the duration of one process run: claiming resets any
//! stale dump left behind by an earlier run, reading polls with a bounded
//! wait and archives the dump if one appeared, and dropping the slot resets
//! it again on every exit path so a stale dump never leaks into a later
//! run's attribution.

#![allow(dead_code)]

use std::time::Duration;
use tracing::{debug, warn};

use crate::launcher::Workspace;

/// Scoped claim on the crash-report slot for one run
pub struct CrashReportSlot<'a> {
    workspace: &'a dyn Workspace,
    run_id: u32,
}

impl<'a> CrashReportSlot<'a> {
    /// Claim the slot, resetting any stale dump from a previous run
    pub fn claim(workspace: &'a dyn Workspace, run_id: u32) -> Self {
        workspace.reset_crash_report(run_id);
        Self { workspace, run_id }
    }

    /// Poll for a crash dump up to `grace`, archiving it if found
    pub fn read(&self, grace: Duration) -> Option<String> {
        let report = self.workspace.poll_crash_report(self.run_id, grace);
        match &report {
            Some(_) => {
                let path = self.workspace.crash_report_path(self.run_id);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "crash.log".to_string());
                if let Err(err) = self.workspace.save_artifact(&path, &name) {
                    warn!("Crash occurred, but could not archive dump {name}: {err}");
                }
                self.workspace.reset_crash_report(self.run_id);
            }
            None => {
                debug!(
                    "No crash dump appeared for run {} within {:?}",
                    self.run_id, grace
                );
            }
        }
        report
    }
}

impl Drop for CrashReportSlot<'_> {
    fn drop(&mut self) {
        self.workspace.reset_crash_report(self.run_id);
    }
}

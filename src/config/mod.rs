//! Suite configuration
//!
//! Handles loading and managing the orchestration settings shared by every
//! run in a session.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied to every process launched during a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Arguments appended to every invocation
    pub global_args: Vec<String>,

    /// Run without a renderer unless a test overrides it
    pub use_null_renderer: bool,

    /// Maximum time one shared (multi-test) process may stay open, in seconds
    pub shared_timeout_secs: u64,

    /// Bound on concurrently running processes
    pub parallel_workers: usize,

    /// Collapse parallel groups into their serial counterparts
    pub no_parallel: bool,

    /// Collapse batched groups into their unbatched counterparts
    pub no_batch: bool,

    /// Bounded wait for a crash dump after an abnormal exit, in seconds
    pub crash_grace_secs: u64,

    /// Feature toggle flags appended to every invocation
    pub feature_toggles: Vec<String>,

    /// Log file name the application writes for each run
    pub log_name: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            global_args: vec!["--batch-mode".to_string(), "--autotest-mode".to_string()],
            use_null_renderer: true,
            shared_timeout_secs: 300,
            parallel_workers: 8,
            no_parallel: false,
            no_batch: false,
            crash_grace_secs: 20,
            feature_toggles: Vec::new(),
            log_name: "run.log".to_string(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Worker count with the documented lower bound
    pub fn worker_count(&self) -> usize {
        self.parallel_workers.max(1)
    }
}

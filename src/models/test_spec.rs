//! Test descriptors
//!
//! A [`TestSpec`] describes one black-box test: the module the launched
//! application should execute, its time budget, and whether it may share a
//! process with other tests (batching) or run alongside other instances
//! (parallelism). Specs are immutable once declared; the partitioner and
//! runners only ever read them.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default per-test time budget, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Immutable descriptor of a single test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Test name, unique within a suite
    pub name: String,

    /// Opaque module reference, resolved to a file path by the launcher
    pub module_ref: String,

    /// Maximum time for the run, in seconds
    pub timeout_secs: u64,

    /// Attach a debugger when running the test. Never enable in production.
    pub attach_debugger: bool,

    /// Block at startup until a debugger attaches
    pub wait_for_debugger: bool,

    /// Whether the test may share one process with other tests; unset means
    /// the test is not shared at all
    pub is_batchable: Option<bool>,

    /// Whether the test may run concurrently with other instances; unset
    /// means the test is not shared at all
    pub is_parallelizable: Option<bool>,

    /// Extra command-line arguments for this test's invocation
    pub extra_args: Vec<String>,

    /// Per-test override of the suite-wide null renderer setting
    pub use_null_renderer: Option<bool>,
}

impl TestSpec {
    /// Create a test that runs alone in its own process
    pub fn single(name: impl Into<String>, module_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_ref: module_ref.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            attach_debugger: false,
            wait_for_debugger: false,
            is_batchable: None,
            is_parallelizable: None,
            extra_args: Vec::new(),
            use_null_renderer: None,
        }
    }

    /// Create a test that may be both batched and parallelized
    pub fn shared(name: impl Into<String>, module_ref: impl Into<String>) -> Self {
        Self {
            is_batchable: Some(true),
            is_parallelizable: Some(true),
            ..Self::single(name, module_ref)
        }
    }

    /// Create a test that may be batched but never runs in parallel
    pub fn batched(name: impl Into<String>, module_ref: impl Into<String>) -> Self {
        Self {
            is_batchable: Some(true),
            is_parallelizable: Some(false),
            ..Self::single(name, module_ref)
        }
    }

    /// Create a test that may run in parallel but never shares a process
    pub fn parallel(name: impl Into<String>, module_ref: impl Into<String>) -> Self {
        Self {
            is_batchable: Some(false),
            is_parallelizable: Some(true),
            ..Self::single(name, module_ref)
        }
    }

    /// Override the time budget
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Add extra command-line arguments to the invocation
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Override the suite-wide null renderer flag for this test
    pub fn with_null_renderer(mut self, enabled: bool) -> Self {
        self.use_null_renderer = Some(enabled);
        self
    }

    /// Request a debugger attach for this run
    pub fn with_debugger(mut self, attach: bool, wait: bool) -> Self {
        self.attach_debugger = attach;
        self.wait_for_debugger = wait;
        self
    }

    /// The time budget as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn batchable(&self) -> bool {
        self.is_batchable.unwrap_or(false)
    }

    pub fn parallelizable(&self) -> bool {
        self.is_parallelizable.unwrap_or(false)
    }

    /// A test with neither flag declared runs alone
    pub fn is_shared(&self) -> bool {
        self.batchable() || self.parallelizable()
    }
}

impl fmt::Display for TestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.module_ref)
    }
}

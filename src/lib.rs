//! Out-of-process black-box test orchestration engine
//!
//! Runs test modules inside externally launched application instances,
//! grouping them into execution modes that trade isolation for throughput:
//! single (one process, one test), batched (one process, many tests),
//! parallel (many processes, one test each) and parallel batched. Crashes
//! and hangs are detected per process, and a per-test verdict is
//! reconstructed from the combined output stream, the application log, the
//! exit code and any crash dump, even when many tests shared one process.
//!
//! The actual application binary, its workspace layout and the outer test
//! discovery framework are external collaborators behind the traits in
//! [`launcher`]; the engine only orchestrates.

pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod models;
pub mod partition;
pub mod runner;
pub mod scraper;
pub mod session;
pub mod utils;

pub use classifier::FAIL_EXIT_CODE;
pub use config::SuiteConfig;
pub use error::HarnessError;
pub use executor::ParallelCoordinator;
pub use launcher::{AssetService, Launcher, WaitError, Workspace};
pub use models::{TestResult, TestSpec};
pub use partition::{partition, shard, Partition, PartitionOverrides};
pub use runner::{CrashReportSlot, ProcessRunner};
pub use session::{ResultStore, RunGroup, RunMode, SessionData, SuiteRunner};

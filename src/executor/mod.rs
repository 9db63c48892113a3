//! Execution engines
//!
//! Fans shared tests out across bounded pools of worker threads.

pub mod parallel;

pub use parallel::ParallelCoordinator;

//! Data models for test orchestration
//!
//! Defines test descriptors and the per-test result taxonomy.

pub mod result;
pub mod test_spec;

pub use result::TestResult;
pub use test_spec::TestSpec;

//! Engine error taxonomy
//!
//! Distinguishes engine defects (missing results, ordering violations) from
//! ordinary test failures, which carry their full report text.

use thiserror::Error;

/// Errors surfaced by the orchestration engine
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Asset service error: {0}")]
    AssetService(String),

    #[error("No run data for test '{name}'")]
    MissingResult { name: String },

    #[error("Result check for test '{test}' ran before group '{group}' executed")]
    GroupNotExecuted { group: String, test: String },

    #[error("Test '{name}' did not pass:\n{report}")]
    TestFailed { name: String, report: String },

    #[error("Result count mismatch: expected {expected} results, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_result_message() {
        let err = HarnessError::MissingResult {
            name: "my_test".to_string(),
        };
        assert!(err.to_string().contains("my_test"));
    }

    #[test]
    fn test_failed_carries_report() {
        let err = HarnessError::TestFailed {
            name: "t1".to_string(),
            report: "Test FAILED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("t1"));
        assert!(msg.contains("Test FAILED"));
    }
}

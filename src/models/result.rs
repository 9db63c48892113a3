//! Per-test result taxonomy
//!
//! One [`TestResult`] is produced for every test submitted to a run, whether
//! it ran alone or shared a process with others. `Unknown` is reserved for
//! missing or corrupted signal and is always treated as a failure by the
//! reporting layer, never as success by default.

#![allow(dead_code)]

use std::fmt;

/// Outcome of one test run attempt
///
/// Every variant carries the test name, the raw captured stdout and the
/// test's window of the application log (both may be empty).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestResult {
    /// The test completed and reported success
    Pass {
        test_name: String,
        output: String,
        log: String,
    },

    /// The test completed and reported an assertion failure
    Fail {
        test_name: String,
        output: String,
        log: String,
    },

    /// The process terminated abnormally while this test was running
    Crash {
        test_name: String,
        output: String,
        log: String,
        return_code: i32,
        stacktrace: Option<String>,
    },

    /// The process exceeded its time budget while this test was running
    Timeout {
        test_name: String,
        output: String,
        log: String,
        seconds: u64,
    },

    /// No verdict could be scraped for this test
    Unknown {
        test_name: String,
        output: String,
        log: String,
        extra_info: String,
    },
}

impl TestResult {
    pub fn test_name(&self) -> &str {
        match self {
            TestResult::Pass { test_name, .. }
            | TestResult::Fail { test_name, .. }
            | TestResult::Crash { test_name, .. }
            | TestResult::Timeout { test_name, .. }
            | TestResult::Unknown { test_name, .. } => test_name,
        }
    }

    pub fn output(&self) -> &str {
        match self {
            TestResult::Pass { output, .. }
            | TestResult::Fail { output, .. }
            | TestResult::Crash { output, .. }
            | TestResult::Timeout { output, .. }
            | TestResult::Unknown { output, .. } => output,
        }
    }

    pub fn log(&self) -> &str {
        match self {
            TestResult::Pass { log, .. }
            | TestResult::Fail { log, .. }
            | TestResult::Crash { log, .. }
            | TestResult::Timeout { log, .. }
            | TestResult::Unknown { log, .. } => log,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            TestResult::Pass { .. } => "PASS",
            TestResult::Fail { .. } => "FAIL",
            TestResult::Crash { .. } => "CRASH",
            TestResult::Timeout { .. } => "TIMEOUT",
            TestResult::Unknown { .. } => "UNKNOWN",
        }
    }

    fn output_section(&self) -> &str {
        let output = self.output();
        if output.is_empty() {
            "-- No output --"
        } else {
            output
        }
    }

    fn log_section(&self) -> &str {
        let log = self.log();
        if log.is_empty() {
            "-- No app log found --"
        } else {
            log
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Pass { .. } => {
                writeln!(f, "Test Passed")?;
                writeln!(f, "------------")?;
                writeln!(f, "|  Output  |")?;
                writeln!(f, "------------")?;
                writeln!(f, "{}", self.output_section())
            }
            TestResult::Fail { .. } => {
                writeln!(f, "Test FAILED")?;
                writeln!(f, "------------")?;
                writeln!(f, "|  Output  |")?;
                writeln!(f, "------------")?;
                writeln!(f, "{}", self.output_section())?;
                writeln!(f, "-----------")?;
                writeln!(f, "| App log |")?;
                writeln!(f, "-----------")?;
                writeln!(f, "{}", self.log_section())
            }
            TestResult::Crash {
                return_code,
                stacktrace,
                ..
            } => {
                writeln!(f, "Test CRASHED, return code {return_code:#x}")?;
                writeln!(f, "--------------")?;
                writeln!(f, "| Stacktrace |")?;
                writeln!(f, "--------------")?;
                writeln!(
                    f,
                    "{}",
                    stacktrace
                        .as_deref()
                        .unwrap_or("-- No stacktrace data found --")
                )?;
                writeln!(f, "------------")?;
                writeln!(f, "|  Output  |")?;
                writeln!(f, "------------")?;
                writeln!(f, "{}", self.output_section())?;
                writeln!(f, "-----------")?;
                writeln!(f, "| App log |")?;
                writeln!(f, "-----------")?;
                writeln!(f, "{}", self.log_section())
            }
            TestResult::Timeout { seconds, .. } => {
                writeln!(
                    f,
                    "Test ABORTED after not completing within {seconds} seconds"
                )?;
                writeln!(f, "------------")?;
                writeln!(f, "|  Output  |")?;
                writeln!(f, "------------")?;
                writeln!(f, "{}", self.output_section())?;
                writeln!(f, "-----------")?;
                writeln!(f, "| App log |")?;
                writeln!(f, "-----------")?;
                writeln!(f, "{}", self.log_section())
            }
            TestResult::Unknown { extra_info, .. } => {
                writeln!(
                    f,
                    "Indeterminate test result interpreted as failure, possible cause: {extra_info}"
                )?;
                writeln!(f, "------------")?;
                writeln!(f, "|  Output  |")?;
                writeln!(f, "------------")?;
                writeln!(f, "{}", self.output_section())?;
                writeln!(f, "-----------")?;
                writeln!(f, "| App log |")?;
                writeln!(f, "-----------")?;
                writeln!(f, "{}", self.log_section())
            }
        }
    }
}

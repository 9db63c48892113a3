//! Result classification
//!
//! Turns the observable signals of one finished process (exit code, scraped
//! markers, crash dump availability, elapsed time) into exactly one typed
//! [`TestResult`] per submitted test, whether the process ran one test or a
//! shared batch.
//!
//! Attribution for shared processes relies on the application running its
//! assigned tests strictly in declaration order and emitting a marker only
//! when a test's in-process run completes. Absence of a marker is the only
//! observable signal of "did not finish", so the first marker-less test in
//! declaration order is deemed the one that crashed or timed out. If the
//! application ever buffered or reordered markers across tests this would
//! mis-attribute the offender; that assumption is inherited, not defended.

#![allow(dead_code)]

use std::collections::HashMap;
use tracing::debug;

use crate::models::{TestResult, TestSpec};
use crate::scraper;

/// Reserved exit code meaning "at least one test failed an assertion"
///
/// Distinct from 0 (all passed) and from every crash code the OS or runtime
/// produces on abnormal termination.
pub const FAIL_EXIT_CODE: i32 = 0xF;

/// Build Pass/Fail/Unknown results for every spec from the scraped markers
///
/// The log is cut into one contiguous window per test in declaration order,
/// so each result only carries its own slice of the process-shared log.
pub fn results_from_output(
    specs: &[TestSpec],
    output: &str,
    log: &str,
) -> HashMap<String, TestResult> {
    let markers = scraper::scrape_markers(output);
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    let windows = scraper::window_log(log, &names);

    let mut results = HashMap::new();
    for (spec, window) in specs.iter().zip(windows) {
        let result = match markers.get(spec.name.as_str()) {
            Some(marker) if marker.success => TestResult::Pass {
                test_name: spec.name.clone(),
                output: marker.output.clone(),
                log: window.to_string(),
            },
            Some(marker) => TestResult::Fail {
                test_name: spec.name.clone(),
                output: marker.output.clone(),
                log: window.to_string(),
            },
            None => TestResult::Unknown {
                test_name: spec.name.clone(),
                output: output.to_string(),
                log: window.to_string(),
                extra_info: format!(
                    "Found no test run information on stdout for {}",
                    spec.name
                ),
            },
        };
        results.insert(spec.name.clone(), result);
    }
    results
}

/// Classify a process that returned on its own, by exit code
///
/// Exit code 0 means every test in the invocation passed, with no scraping
/// needed. The fail sentinel triggers a scrape for per-test verdicts. Any
/// other code is a crash: scrape first to recover as much per-test signal as
/// possible, then attribute the crash positionally. `crash_probe` fetches
/// the crash dump text and is called at most once.
pub fn classify_exit(
    specs: &[TestSpec],
    return_code: i32,
    output: &str,
    log: &str,
    crash_probe: &mut dyn FnMut() -> Option<String>,
) -> HashMap<String, TestResult> {
    if return_code == 0 {
        // Clean exit means all member tests signaled success.
        return specs
            .iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    TestResult::Pass {
                        test_name: spec.name.clone(),
                        output: output.to_string(),
                        log: log.to_string(),
                    },
                )
            })
            .collect();
    }

    let mut results = results_from_output(specs, output, log);
    if return_code != FAIL_EXIT_CODE {
        debug!("Process exited abnormally with code {return_code:#x}, attributing crash");
        attribute_crash(specs, &mut results, return_code, output, crash_probe);
    }
    results
}

/// Classify a process that was stopped after exceeding its time budget
///
/// Same positional attribution as a crash, tagging the offender with
/// `Timeout` instead.
pub fn classify_timeout(
    specs: &[TestSpec],
    output: &str,
    log: &str,
    seconds: u64,
) -> HashMap<String, TestResult> {
    let mut results = results_from_output(specs, output, log);
    attribute_timeout(specs, &mut results, seconds);
    results
}

fn attribute_crash(
    specs: &[TestSpec],
    results: &mut HashMap<String, TestResult>,
    return_code: i32,
    output: &str,
    crash_probe: &mut dyn FnMut() -> Option<String>,
) {
    let mut offender: Option<String> = None;
    for spec in specs {
        let log = match results.get(&spec.name) {
            Some(TestResult::Unknown { log, .. }) => log.clone(),
            _ => continue,
        };
        match &offender {
            None => {
                // The first test without a marker is the one that crashed.
                let stacktrace = crash_probe();
                results.insert(
                    spec.name.clone(),
                    TestResult::Crash {
                        test_name: spec.name.clone(),
                        output: output.to_string(),
                        log,
                        return_code,
                        stacktrace,
                    },
                );
                offender = Some(spec.name.clone());
            }
            Some(offender_name) => {
                let extra_info = format!(
                    "This test has unknown result, test '{offender_name}' crashed before this test could be executed"
                );
                if let Some(TestResult::Unknown {
                    extra_info: slot, ..
                }) = results.get_mut(&spec.name)
                {
                    *slot = extra_info;
                }
            }
        }
    }

    // Every test produced a marker yet the process died abnormally: the last
    // declared test was mid-execution when it happened.
    if offender.is_none() {
        if let Some(last) = specs.last() {
            let stacktrace = crash_probe();
            let log = results
                .get(&last.name)
                .map(|r| r.log().to_string())
                .unwrap_or_default();
            results.insert(
                last.name.clone(),
                TestResult::Crash {
                    test_name: last.name.clone(),
                    output: output.to_string(),
                    log,
                    return_code,
                    stacktrace,
                },
            );
        }
    }
}

fn attribute_timeout(specs: &[TestSpec], results: &mut HashMap<String, TestResult>, seconds: u64) {
    let mut offender: Option<String> = None;
    for spec in specs {
        let (output, log) = match results.get(&spec.name) {
            Some(TestResult::Unknown { output, log, .. }) => (output.clone(), log.clone()),
            _ => continue,
        };
        match &offender {
            None => {
                results.insert(
                    spec.name.clone(),
                    TestResult::Timeout {
                        test_name: spec.name.clone(),
                        output,
                        log,
                        seconds,
                    },
                );
                offender = Some(spec.name.clone());
            }
            Some(offender_name) => {
                let extra_info = format!(
                    "This test has unknown result, test '{offender_name}' timed out before this test could be executed"
                );
                if let Some(TestResult::Unknown {
                    extra_info: slot, ..
                }) = results.get_mut(&spec.name)
                {
                    *slot = extra_info;
                }
            }
        }
    }

    // All tests ran to completion, so the one holding the process open past
    // the budget was the last declared test.
    if offender.is_none() {
        if let Some(last) = specs.last() {
            let (output, log) = results
                .get(&last.name)
                .map(|r| (r.output().to_string(), r.log().to_string()))
                .unwrap_or_default();
            results.insert(
                last.name.clone(),
                TestResult::Timeout {
                    test_name: last.name.clone(),
                    output,
                    log,
                    seconds,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(names: &[&str]) -> Vec<TestSpec> {
        names
            .iter()
            .map(|n| TestSpec::shared(*n, format!("tests/{n}")))
            .collect()
    }

    fn marker(name: &str, success: bool) -> String {
        format!("JSON_START({{\"name\":\"{name}\",\"output\":\"o_{name}\",\"success\":{success}}})JSON_END")
    }

    fn no_probe() -> impl FnMut() -> Option<String> {
        || None
    }

    #[test]
    fn test_clean_exit_passes_everything_without_markers() {
        let specs = specs(&["a", "b", "c"]);
        let results = classify_exit(&specs, 0, "no markers here", "log", &mut no_probe());
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|r| r.is_pass()));
    }

    #[test]
    fn test_fail_sentinel_scrapes_verdicts() {
        let specs = specs(&["a", "b", "c"]);
        let output = format!("{}\n{}", marker("a", true), marker("b", false));
        let results = classify_exit(&specs, FAIL_EXIT_CODE, &output, "", &mut no_probe());
        assert_eq!(results.len(), 3);
        assert!(results["a"].is_pass());
        assert!(matches!(results["b"], TestResult::Fail { .. }));
        match &results["c"] {
            TestResult::Unknown { extra_info, .. } => {
                assert!(extra_info.contains("c"));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_crash_attributed_to_first_markerless_test() {
        let specs = specs(&["a", "b", "c", "d"]);
        let output = format!("{}\n{}", marker("a", true), marker("b", true));
        let mut probe_calls = 0;
        let mut probe = || {
            probe_calls += 1;
            Some("stack".to_string())
        };
        let results = classify_exit(&specs, 0x8B, &output, "", &mut probe);
        assert_eq!(results.len(), 4);
        assert!(results["a"].is_pass());
        assert!(results["b"].is_pass());
        match &results["c"] {
            TestResult::Crash {
                return_code,
                stacktrace,
                ..
            } => {
                assert_eq!(*return_code, 0x8B);
                assert_eq!(stacktrace.as_deref(), Some("stack"));
            }
            other => panic!("expected Crash, got {other:?}"),
        }
        match &results["d"] {
            TestResult::Unknown { extra_info, .. } => {
                assert!(extra_info.contains("'c'"));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
        assert_eq!(probe_calls, 1);
    }

    #[test]
    fn test_crash_with_all_markers_blames_last_test() {
        let specs = specs(&["a", "b"]);
        let output = format!("{}\n{}", marker("a", true), marker("b", true));
        let results = classify_exit(&specs, 0x8B, &output, "", &mut no_probe());
        assert!(results["a"].is_pass());
        assert!(matches!(results["b"], TestResult::Crash { .. }));
    }

    #[test]
    fn test_timeout_attribution() {
        let specs = specs(&["a", "b", "c"]);
        let output = marker("a", true);
        let results = classify_timeout(&specs, &output, "", 300);
        assert!(results["a"].is_pass());
        match &results["b"] {
            TestResult::Timeout { seconds, .. } => assert_eq!(*seconds, 300),
            other => panic!("expected Timeout, got {other:?}"),
        }
        match &results["c"] {
            TestResult::Unknown { extra_info, .. } => {
                assert!(extra_info.contains("'b'"));
                assert!(extra_info.contains("timed out"));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_with_all_markers_blames_last_test() {
        let specs = specs(&["a", "b"]);
        let output = format!("{}\n{}", marker("a", true), marker("b", true));
        let results = classify_timeout(&specs, &output, "", 300);
        assert!(results["a"].is_pass());
        assert!(matches!(results["b"], TestResult::Timeout { .. }));
    }

    #[test]
    fn test_always_one_result_per_spec() {
        let specs = specs(&["a", "b", "c", "d", "e"]);
        for code in [0, FAIL_EXIT_CODE, 1, -11] {
            let results = classify_exit(&specs, code, "", "", &mut no_probe());
            assert_eq!(results.len(), specs.len(), "exit code {code}");
        }
        let results = classify_timeout(&specs, "", "", 10);
        assert_eq!(results.len(), specs.len());
    }

    #[test]
    fn test_log_windowing_per_test() {
        let specs = specs(&["a", "b"]);
        let log = format!("boot\n{}\nsecond part\n{}", marker("a", true), marker("b", false));
        let output = format!("{}\n{}", marker("a", true), marker("b", false));
        let results = classify_exit(&specs, FAIL_EXIT_CODE, &output, &log, &mut no_probe());
        assert!(results["a"].log().contains("boot"));
        assert!(!results["a"].log().contains("second part"));
        assert!(results["b"].log().contains("second part"));
    }
}

//! Output scraping
//!
//! The launched application prints one delimited marker per completed test,
//! of the form `JSON_START(<json>)JSON_END`, both to stdout and to its log
//! file. Scraping extracts those markers from a combined stream, and the log
//! offsets of the matches let a process-shared log be cut into one window
//! per test in declaration order.

#![allow(dead_code)]

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// One test's structured result marker, as printed by the application
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TestMarker {
    pub name: String,
    pub output: String,
    pub success: bool,
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"JSON_START\((.+?)\)JSON_END").unwrap())
}

/// Extract every well-formed marker from the given text, keyed by test name
///
/// Malformed payloads are skipped; a corrupt marker never aborts the scan.
pub fn scrape_markers(text: &str) -> HashMap<String, TestMarker> {
    let mut markers = HashMap::new();
    for capture in marker_pattern().captures_iter(text) {
        match serde_json::from_str::<TestMarker>(&capture[1]) {
            Ok(marker) => {
                markers.insert(marker.name.clone(), marker);
            }
            Err(err) => {
                debug!("Skipping malformed result marker: {err}");
            }
        }
    }
    markers
}

/// Find the byte offset just past each marker match in the log, keyed by name
///
/// Used to cut the process-shared log into per-test windows. Only markers
/// with a parseable payload are recorded.
pub fn scrape_log_offsets(log: &str) -> HashMap<String, usize> {
    let mut offsets = HashMap::new();
    for capture in marker_pattern().captures_iter(log) {
        if let Ok(marker) = serde_json::from_str::<TestMarker>(&capture[1]) {
            let m = capture.get(0).unwrap();
            offsets.insert(marker.name, m.end());
        }
    }
    offsets
}

/// Cut the log into contiguous per-test windows in declaration order
///
/// Window `i` spans from the end of window `i - 1` (or the file start) to
/// the end of marker `i`'s match. The last declared test, and any test whose
/// marker never appeared in the log, gets everything up to the end of file.
pub fn window_log<'a>(log: &'a str, ordered_names: &[&str]) -> Vec<&'a str> {
    let offsets = scrape_log_offsets(log);
    let mut windows = Vec::with_capacity(ordered_names.len());
    let mut start = 0usize;
    for (i, name) in ordered_names.iter().enumerate() {
        let is_last = i == ordered_names.len() - 1;
        let end = match offsets.get(*name) {
            Some(&end) if !is_last => end,
            _ => log.len(),
        };
        windows.push(&log[start.min(end)..end]);
        start = end;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(name: &str, success: bool) -> String {
        format!("JSON_START({{\"name\":\"{name}\",\"output\":\"o_{name}\",\"success\":{success}}})JSON_END")
    }

    #[test]
    fn test_marker_round_trip() {
        let text = r#"noise JSON_START({"name":"T","output":"o","success":true})JSON_END trailing"#;
        let markers = scrape_markers(text);
        assert_eq!(markers.len(), 1);
        let m = &markers["T"];
        assert_eq!(m.output, "o");
        assert!(m.success);
    }

    #[test]
    fn test_malformed_marker_is_skipped() {
        let text = format!(
            "JSON_START(not json at all)JSON_END\n{}\nJSON_START({{\"name\":)JSON_END",
            marker("t2", false)
        );
        let markers = scrape_markers(&text);
        assert_eq!(markers.len(), 1);
        assert!(!markers["t2"].success);
    }

    #[test]
    fn test_multiple_markers_in_one_stream() {
        let text = format!("{}\nsome log lines\n{}", marker("a", true), marker("b", false));
        let markers = scrape_markers(&text);
        assert_eq!(markers.len(), 2);
        assert!(markers["a"].success);
        assert!(!markers["b"].success);
    }

    #[test]
    fn test_log_windows_follow_declaration_order() {
        let log = format!(
            "boot\n{}\nmiddle\n{}\ntail",
            marker("a", true),
            marker("b", true)
        );
        let windows = window_log(&log, &["a", "b"]);
        assert_eq!(windows.len(), 2);
        assert!(windows[0].contains("boot"));
        assert!(windows[0].ends_with("JSON_END"));
        assert!(windows[1].contains("middle"));
        // Last declared test owns the remainder of the file.
        assert!(windows[1].ends_with("tail"));
    }

    #[test]
    fn test_window_for_missing_marker_extends_to_eof() {
        let log = format!("start\n{}\nafter", marker("a", true));
        let windows = window_log(&log, &["a", "b", "c"]);
        assert_eq!(windows.len(), 3);
        assert!(windows[1].contains("after"));
        assert!(windows[2].is_empty());
    }

    #[test]
    fn test_empty_log_yields_empty_windows() {
        let windows = window_log("", &["a", "b"]);
        assert_eq!(windows, vec!["", ""]);
    }
}

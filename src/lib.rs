//! Tattle: test run capture and report generation
//!
//! This library reads a JSON-lines test event stream into a hierarchical
//! capture, renders it as a self-contained HTML report with a compressed
//! embedded payload, and re-ingests generated reports through the viewer's
//! payload loader and tree builder.

pub mod capture;
pub mod config;
pub mod reporter;
pub mod viewer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One captured line of test output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutput {
    /// Position within the capture's output stream
    pub index: usize,
    /// Raw captured content, including any trailing newline
    pub text: String,
}

/// One test or suite node in a capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Position of this node relative to its siblings
    pub index: usize,
    /// When the node started running; None if it never did
    pub started_at: Option<DateTime<Utc>>,
    /// When the node reached a terminal state; None for aborted runs
    pub ended_at: Option<DateTime<Utc>>,
    /// Hierarchical name, segments separated by `/`; empty for nodes
    /// identified only by `package`
    pub full_name: String,
    /// Package the test belongs to
    pub package: String,
    /// Captured output lines, frozen at read time
    #[serde(default)]
    pub output: Vec<TestOutput>,
    /// Whether the node reached a terminal state
    pub done: bool,
    /// Skipped nodes are exempt from pass/fail evaluation
    pub skipped: bool,
    pub passed: bool,
    /// Run duration in seconds; meaningful only when `done`
    pub elapsed: f64,
    /// Child nodes, ascending `index` order
    #[serde(default, deserialize_with = "deserialize_tests")]
    pub tests: Vec<Arc<TestResult>>,
}

/// A complete test run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCapture {
    /// Top-level test nodes, ascending `index` order
    #[serde(default, deserialize_with = "deserialize_tests")]
    pub tests: Vec<Arc<TestResult>>,
    pub title: String,
    /// Timestamp of the first event in the run
    pub started_at: Option<DateTime<Utc>>,
    /// Timestamp of the last event in the run
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock bounds of the capture session itself
    pub capture_started_at: DateTime<Utc>,
    pub capture_ended_at: DateTime<Utc>,
}

impl TestResult {
    /// Last segment of the hierarchical name
    pub fn name(&self) -> &str {
        self.full_name.rsplit('/').next().unwrap_or("")
    }

    /// Name shown to users: the package for package-level nodes
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.package
        } else {
            self.name()
        }
    }

    /// This node's output merged with all descendants', in capture order
    pub fn full_output(&self) -> String {
        let mut outputs: Vec<&TestOutput> = Vec::new();
        self.collect_output(&mut outputs);
        outputs.sort_by_key(|o| o.index);
        outputs.iter().map(|o| o.text.as_str()).collect()
    }

    fn collect_output<'a>(&'a self, into: &mut Vec<&'a TestOutput>) {
        into.extend(self.output.iter());
        for test in &self.tests {
            test.collect_output(into);
        }
    }
}

/// The schema evolved between an ordered array of children and a name-keyed
/// map of children; accept both and normalize into a sequence sorted by
/// `index`, since a keyed map does not guarantee iteration order.
fn deserialize_tests<'de, D>(deserializer: D) -> Result<Vec<Arc<TestResult>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TestsField {
        Ordered(Vec<Arc<TestResult>>),
        Keyed(HashMap<String, Arc<TestResult>>),
    }

    let mut tests = match TestsField::deserialize(deserializer)? {
        TestsField::Ordered(tests) => tests,
        TestsField::Keyed(map) => map.into_values().collect(),
    };
    tests.sort_by_key(|t| t.index);
    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(index: usize, full_name: &str) -> Arc<TestResult> {
        Arc::new(TestResult {
            index,
            started_at: None,
            ended_at: None,
            full_name: full_name.to_string(),
            package: "example/pkg".to_string(),
            output: vec![],
            done: true,
            skipped: false,
            passed: true,
            elapsed: 0.1,
            tests: vec![],
        })
    }

    #[test]
    fn test_name_is_last_segment() {
        assert_eq!(leaf(0, "TestFoo").name(), "TestFoo");
        assert_eq!(leaf(0, "TestFoo/sub/case").name(), "case");
        assert_eq!(leaf(0, "").name(), "");
    }

    #[test]
    fn test_display_name_falls_back_to_package() {
        assert_eq!(leaf(0, "").display_name(), "example/pkg");
        assert_eq!(leaf(0, "TestFoo/sub").display_name(), "sub");
    }

    #[test]
    fn test_full_output_merges_descendants_in_capture_order() {
        let mut child = (*leaf(1, "TestFoo/sub")).clone();
        child.output = vec![
            TestOutput { index: 1, text: "b".into() },
            TestOutput { index: 3, text: "d".into() },
        ];
        let mut parent = (*leaf(0, "TestFoo")).clone();
        parent.output = vec![
            TestOutput { index: 0, text: "a".into() },
            TestOutput { index: 2, text: "c".into() },
        ];
        parent.tests = vec![Arc::new(child)];

        assert_eq!(parent.full_output(), "abcd");
    }

    #[test]
    fn test_tests_accepts_ordered_array() {
        let json = r#"{
            "index": 0,
            "started_at": null,
            "ended_at": null,
            "full_name": "",
            "package": "example/pkg",
            "output": [],
            "done": true,
            "skipped": false,
            "passed": true,
            "elapsed": 1.5,
            "tests": [
                {"index": 2, "started_at": null, "ended_at": null, "full_name": "TestB",
                 "package": "example/pkg", "output": [], "done": true, "skipped": false,
                 "passed": true, "elapsed": 0.2, "tests": []},
                {"index": 1, "started_at": null, "ended_at": null, "full_name": "TestA",
                 "package": "example/pkg", "output": [], "done": true, "skipped": false,
                 "passed": true, "elapsed": 0.1, "tests": []}
            ]
        }"#;
        let parsed: TestResult = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = parsed.tests.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["TestA", "TestB"], "array order must yield to index order");
    }

    #[test]
    fn test_tests_accepts_keyed_map() {
        let json = r#"{
            "index": 0,
            "started_at": null,
            "ended_at": null,
            "full_name": "",
            "package": "example/pkg",
            "output": [],
            "done": true,
            "skipped": false,
            "passed": true,
            "elapsed": 1.5,
            "tests": {
                "TestB": {"index": 2, "started_at": null, "ended_at": null, "full_name": "TestB",
                          "package": "example/pkg", "output": [], "done": true, "skipped": false,
                          "passed": true, "elapsed": 0.2, "tests": {}},
                "TestA": {"index": 1, "started_at": null, "ended_at": null, "full_name": "TestA",
                          "package": "example/pkg", "output": [], "done": true, "skipped": false,
                          "passed": true, "elapsed": 0.1, "tests": {}}
            }
        }"#;
        let parsed: TestResult = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = parsed.tests.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["TestA", "TestB"], "keyed children must be ordered by index");
    }

    #[test]
    fn test_serializes_children_as_array() {
        let mut parent = (*leaf(0, "TestFoo")).clone();
        parent.tests = vec![leaf(1, "TestFoo/a"), leaf(2, "TestFoo/b")];
        let value = serde_json::to_value(&parent).unwrap();
        assert!(value["tests"].is_array());
        assert_eq!(value["tests"][0]["full_name"], "TestFoo/a");
    }
}

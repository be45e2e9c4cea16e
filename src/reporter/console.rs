//! Console reporter with colored output
//!
//! Prints a capture's view tree to the terminal, one row per node,
//! indented by depth. Collapse markers mirror the default expand state a
//! report page would open with.

use crate::viewer::tree::{ViewTestCapture, ViewTestResult};
use crate::TestResult;
use colored::{ColoredString, Colorize};

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to dump captured output under failed nodes
    show_output: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self { show_output: false }
    }

    /// Dump captured output under failed nodes
    pub fn with_output(mut self) -> Self {
        self.show_output = true;
        self
    }

    /// Print the full tree of a capture
    pub fn report(&self, capture: &ViewTestCapture) {
        if !capture.data.title.is_empty() {
            println!("{}", capture.data.title.bold());
        }
        if let (Some(started), Some(ended)) = (capture.data.started_at, capture.data.ended_at) {
            println!(
                "{}",
                format!("ran {} – {}", started.to_rfc3339(), ended.to_rfc3339()).dimmed()
            );
        }
        println!();
        for test in &capture.tests {
            self.print_node(test, 0);
        }
    }

    /// Print one line per failed test only
    pub fn report_quiet(&self, capture: &ViewTestCapture) {
        for test in &capture.tests {
            self.print_failed(test);
        }
    }

    fn print_node(&self, node: &ViewTestResult, depth: usize) {
        let indent = "  ".repeat(depth);
        let marker = if node.tests.is_empty() {
            " "
        } else if node.collapsed {
            "▸"
        } else {
            "▾"
        };
        let elapsed = if node.data.done {
            format!(" ({:.3}s)", node.data.elapsed)
        } else {
            String::new()
        };
        println!(
            "{indent}{marker} {} {}{}",
            Self::status_label(&node.data),
            node.data.display_name(),
            elapsed.dimmed()
        );

        if self.show_output && Self::is_failed(&node.data) && node.tests.is_empty() {
            for line in node.data.full_output().lines() {
                println!("{indent}      {}", line.dimmed());
            }
        }

        for child in &node.tests {
            self.print_node(child, depth + 1);
        }
    }

    fn print_failed(&self, node: &ViewTestResult) {
        if Self::is_failed(&node.data) {
            println!(
                "{} {}",
                "FAIL".red().bold(),
                if node.data.full_name.is_empty() {
                    &node.data.package
                } else {
                    &node.data.full_name
                }
            );
        }
        for child in &node.tests {
            self.print_failed(child);
        }
    }

    fn is_failed(data: &TestResult) -> bool {
        data.done && !data.skipped && !data.passed
    }

    fn status_label(data: &TestResult) -> ColoredString {
        if !data.done {
            "RUN ".yellow()
        } else if data.skipped {
            "SKIP".blue()
        } else if data.passed {
            "PASS".green()
        } else {
            "FAIL".red().bold()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn leaf(passed: bool) -> Arc<TestResult> {
        Arc::new(TestResult {
            index: 0,
            started_at: None,
            ended_at: None,
            full_name: "TestFoo".to_string(),
            package: "example/pkg".to_string(),
            output: vec![],
            done: true,
            skipped: false,
            passed,
            elapsed: 0.5,
            tests: vec![],
        })
    }

    #[test]
    fn test_failed_detection_requires_done() {
        let mut running = (*leaf(false)).clone();
        running.done = false;
        assert!(!ConsoleReporter::is_failed(&running));
        assert!(ConsoleReporter::is_failed(&leaf(false)));
        assert!(!ConsoleReporter::is_failed(&leaf(true)));
    }

    #[test]
    fn test_skipped_is_not_failed() {
        let mut skipped = (*leaf(false)).clone();
        skipped.skipped = true;
        assert!(!ConsoleReporter::is_failed(&skipped));
    }
}

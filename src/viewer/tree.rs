//! View-model tree derivation
//!
//! Wraps the raw report tree into presentation nodes, each carrying the
//! raw node, its wrapped children, and a derived default `collapsed` flag.
//! The goal of the heuristic is to surface failures without forcing the
//! user to manually expand a large passing tree.

use crate::{TestCapture, TestResult};
use std::sync::Arc;

/// A raw test node wrapped for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTestResult {
    /// The raw node; presentation reads through to any raw attribute
    pub data: Arc<TestResult>,
    /// Wrapped children, ascending `index` order
    pub tests: Vec<ViewTestResult>,
    /// Whether the node's children start hidden
    pub collapsed: bool,
}

/// A raw capture wrapped for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTestCapture {
    pub data: TestCapture,
    pub tests: Vec<ViewTestResult>,
}

/// Build the full view tree for a capture
pub fn wrap_capture(data: TestCapture) -> ViewTestCapture {
    let tests = wrap_test_results(None, &data.tests);
    ViewTestCapture { data, tests }
}

/// Wrap the `children` of `parent` (None only for the synthetic top-level
/// call), deciding each node's default collapse state.
///
/// The rules form an ordered OR, first true rule wins:
/// top-level nodes are always expanded; a singleton chain is flattened
/// visually; a failing or unfinished branch is expanded so the failure is
/// visible without interaction. Everything else starts collapsed.
pub fn wrap_test_results(
    parent: Option<&TestResult>,
    children: &[Arc<TestResult>],
) -> Vec<ViewTestResult> {
    // The collection's native order need not match sibling order.
    let mut ordered: Vec<&Arc<TestResult>> = children.iter().collect();
    ordered.sort_by_key(|t| t.index);

    let mut tests = Vec::with_capacity(ordered.len());
    for child in ordered {
        let sub_test_count = child.tests.len();
        let mut collapsed = true;
        if parent.map_or(true, |p| p.tests.len() == 1 && sub_test_count > 0) {
            collapsed = false;
        }
        if !child.skipped && !child.passed && sub_test_count > 0 {
            collapsed = false;
        }
        tests.push(ViewTestResult {
            data: Arc::clone(child),
            tests: wrap_test_results(Some(child), &child.tests),
            collapsed,
        });
    }
    tests
}

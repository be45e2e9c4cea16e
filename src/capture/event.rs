//! Wire model for the JSON-lines test event stream
//!
//! One event per line, in the format emitted by `go test -json` style
//! runners: a timestamp, an action, the package and test it applies to,
//! and for terminal actions the elapsed time in seconds.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// What happened to a test at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestAction {
    /// The test binary is about to be executed
    Start,
    /// The test has started running
    Run,
    /// The test has been paused
    Pause,
    /// The test has continued running
    Cont,
    /// The test passed
    Pass,
    /// The benchmark printed log output but did not fail
    Bench,
    /// The test or benchmark failed
    Fail,
    /// The test printed output
    Output,
    /// The test was skipped or the package contained no tests
    Skip,
}

impl TestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestAction::Start => "start",
            TestAction::Run => "run",
            TestAction::Pause => "pause",
            TestAction::Cont => "cont",
            TestAction::Pass => "pass",
            TestAction::Bench => "bench",
            TestAction::Fail => "fail",
            TestAction::Output => "output",
            TestAction::Skip => "skip",
        }
    }
}

impl fmt::Display for TestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded event line
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    pub time: Option<DateTime<Utc>>,
    pub action: TestAction,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub test: String,
    /// Seconds, present on terminal actions
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub output: String,
}

impl TestEvent {
    /// Name of the enclosing test, derived by dropping the last `/`
    /// segment; empty for top-level tests
    pub fn parent_test(&self) -> &str {
        match self.test.rfind('/') {
            Some(pos) => &self.test[..pos],
            None => "",
        }
    }
}

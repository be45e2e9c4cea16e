//! Capture of a test event stream into a hierarchical report
//!
//! Consumes a JSON-lines event stream and materializes the immutable
//! report model. Nodes are accumulated in a mutable arena while the stream
//! is read and frozen into shared-ownership [`TestResult`]s at EOF; after
//! that point the capture is never mutated.

pub mod event;

pub use event::{TestAction, TestEvent};

use crate::{TestCapture, TestOutput, TestResult};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

/// Options for reading an event stream
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Report title
    pub title: String,
    /// Replay the original run timing by sleeping between events
    pub emulate: bool,
}

/// Mutable node state while the stream is being read
struct BuildNode {
    index: usize,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    full_name: String,
    package: String,
    output: Vec<TestOutput>,
    done: bool,
    skipped: bool,
    passed: bool,
    elapsed: f64,
    children: Vec<usize>,
}

/// Incremental capture builder fed one event at a time
pub struct CaptureBuilder {
    nodes: Vec<BuildNode>,
    roots: Vec<usize>,
    by_name: HashMap<String, usize>,
    test_count: usize,
    output_count: usize,
    started_at: Option<DateTime<Utc>>,
    last_ts: Option<DateTime<Utc>>,
    capture_started_at: DateTime<Utc>,
    options: CaptureOptions,
}

/// Read a full event stream into a capture
pub fn read(reader: impl BufRead, options: CaptureOptions) -> Result<TestCapture> {
    let mut builder = CaptureBuilder::new(options);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("read event stream")?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TestEvent = serde_json::from_str(&line)
            .with_context(|| format!("decode test event on line {}", line_no + 1))?;
        builder
            .handle_event(&event)
            .with_context(|| format!("handle test event on line {}", line_no + 1))?;
    }
    Ok(builder.finish())
}

impl CaptureBuilder {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            by_name: HashMap::new(),
            test_count: 0,
            output_count: 0,
            started_at: None,
            last_ts: None,
            capture_started_at: Utc::now(),
            options,
        }
    }

    /// Apply one event to the capture state
    pub fn handle_event(&mut self, event: &TestEvent) -> Result<()> {
        if self.started_at.is_none() {
            self.started_at = event.time;
        }

        // Resolve the node the event applies to: the exact test if it
        // already exists, else its enclosing test, else the package node.
        let mut target = self.by_name.get(event.package.as_str()).copied();
        if target.is_some() {
            if let Some(&id) = self.by_name.get(event.test.as_str()) {
                target = Some(id);
            } else if let Some(&id) = self.by_name.get(event.parent_test()) {
                target = Some(id);
            }
        }

        match event.action {
            TestAction::Start => {
                if target.is_some() {
                    bail!("received second binary start event for: {}", event.package);
                }
                let id = self.new_node(event);
                self.by_name.insert(event.package.clone(), id);
                self.roots.push(id);
            }
            TestAction::Run => {
                let Some(parent) = target else {
                    bail!("no parent for test: {}", event.test);
                };
                if self.nodes[parent].full_name == event.test {
                    bail!("received second run event for test: {}", event.test);
                }
                let id = self.new_node(event);
                self.by_name.insert(event.test.clone(), id);
                self.nodes[parent].children.push(id);
            }
            TestAction::Output => {
                let Some(id) = target else {
                    bail!("received output event for unstarted test: {}", event.test);
                };
                let index = self.output_count;
                self.output_count += 1;
                self.nodes[id].output.push(TestOutput {
                    index,
                    text: event.output.clone(),
                });
            }
            TestAction::Pass | TestAction::Fail | TestAction::Skip => {
                let Some(id) = target else {
                    bail!(
                        "received {} event for unstarted test: {}",
                        event.action,
                        event.test
                    );
                };
                let node = &mut self.nodes[id];
                node.done = true;
                node.passed = event.action == TestAction::Pass;
                node.skipped = event.action == TestAction::Skip;
                node.elapsed = event.elapsed;
                node.ended_at = event.time;
            }
            TestAction::Pause | TestAction::Cont | TestAction::Bench => {}
        }

        self.emulate_gap(event);
        self.last_ts = event.time.or(self.last_ts);
        Ok(())
    }

    /// Freeze the arena into the immutable capture
    pub fn finish(self) -> TestCapture {
        let CaptureBuilder {
            nodes,
            roots,
            started_at,
            last_ts,
            capture_started_at,
            options,
            ..
        } = self;

        // Children are always created after their parent, so a reverse pass
        // has every subtree frozen before its parent needs it.
        let mut frozen: Vec<Option<Arc<TestResult>>> = (0..nodes.len()).map(|_| None).collect();
        for (id, node) in nodes.into_iter().enumerate().rev() {
            let tests = node
                .children
                .iter()
                .map(|&child| frozen[child].take().expect("child frozen before parent"))
                .collect();
            frozen[id] = Some(Arc::new(TestResult {
                index: node.index,
                started_at: node.started_at,
                ended_at: node.ended_at,
                full_name: node.full_name,
                package: node.package,
                output: node.output,
                done: node.done,
                skipped: node.skipped,
                passed: node.passed,
                elapsed: node.elapsed,
                tests,
            }));
        }

        TestCapture {
            tests: roots
                .iter()
                .map(|&id| frozen[id].take().expect("root node frozen"))
                .collect(),
            title: options.title,
            started_at,
            ended_at: last_ts,
            capture_started_at,
            capture_ended_at: Utc::now(),
        }
    }

    fn new_node(&mut self, event: &TestEvent) -> usize {
        let index = self.test_count;
        self.test_count += 1;
        self.nodes.push(BuildNode {
            index,
            started_at: event.time,
            ended_at: None,
            full_name: event.test.clone(),
            package: event.package.clone(),
            output: Vec::new(),
            done: false,
            skipped: false,
            passed: false,
            elapsed: 0.0,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn emulate_gap(&self, event: &TestEvent) {
        if !self.options.emulate {
            return;
        }
        if let (Some(prev), Some(now)) = (self.last_ts, event.time) {
            if let Ok(gap) = (now - prev).to_std() {
                std::thread::sleep(gap);
            }
        }
    }
}

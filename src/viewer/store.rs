//! Shared report state
//!
//! Holds the `{ is_loading, test_capture, filter }` triple consumed by
//! presentation code. There is exactly one writer, the load routine, and
//! arbitrarily many readers; `is_loading` starts true and flips only after
//! a complete parse and tree build, so a failed load is observable as a
//! load that never finishes and a partially-populated report is never
//! exposed.

use crate::viewer::loader::read_report_data;
use crate::viewer::tree::{wrap_capture, ViewTestCapture};
use crate::TestCapture;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, error};

/// Criteria the presentation layer filters with; exposed but never
/// interpreted here
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub test_name: String,
    pub show_passed: bool,
    pub show_failed: bool,
    pub show_skipped: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            test_name: String::new(),
            show_passed: true,
            show_failed: true,
            show_skipped: true,
        }
    }
}

/// Observable report state
#[derive(Debug, Clone, PartialEq)]
pub struct ReportState {
    pub is_loading: bool,
    pub test_capture: Option<ViewTestCapture>,
    pub filter: ReportFilter,
}

type Subscriber = Box<dyn Fn(&ReportState) + Send + Sync>;

/// Single-writer store for the loaded report
pub struct ReportStore {
    state: RwLock<ReportState>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ReportState {
                is_loading: true,
                test_capture: None,
                filter: ReportFilter::default(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback invoked after every state write
    pub fn subscribe(&self, subscriber: impl Fn(&ReportState) + Send + Sync + 'static) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(subscriber));
    }

    /// Read the current state
    pub fn read<R>(&self, f: impl FnOnce(&ReportState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    pub fn is_loading(&self) -> bool {
        self.read(|state| state.is_loading)
    }

    /// Replace the filter criteria
    pub fn set_filter(&self, filter: ReportFilter) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.filter = filter;
        }
        self.notify();
    }

    /// Load a generated report page: fetch and decompress the embedded
    /// payload, parse it, derive the view tree, then publish everything in
    /// one terminal write. On any failure the store stays in its loading
    /// state.
    pub fn load(&self, page: &Path) {
        let start = Instant::now();
        read_report_data(page, |text| {
            if self.ingest(&text) {
                debug!("report load took {:?}", start.elapsed());
            }
        });
    }

    /// Ingest decompressed report JSON directly; returns whether the
    /// report was published
    pub fn ingest(&self, text: &str) -> bool {
        let capture: TestCapture = match serde_json::from_str(text) {
            Ok(capture) => capture,
            Err(err) => {
                error!("failed to decode report payload: {err}");
                return false;
            }
        };
        let view = wrap_capture(capture);
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.test_capture = Some(view);
            state.is_loading = false;
        }
        self.notify();
        true
    }

    fn notify(&self) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        for subscriber in subscribers.iter() {
            subscriber(&state);
        }
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn capture_json(tests: &str) -> String {
        let now = Utc::now().to_rfc3339();
        format!(
            r#"{{"tests": {tests}, "title": "t", "started_at": null, "ended_at": null,
                "capture_started_at": "{now}", "capture_ended_at": "{now}"}}"#
        )
    }

    #[test]
    fn test_new_store_is_loading_with_no_capture() {
        let store = ReportStore::new();
        assert!(store.is_loading());
        assert!(store.read(|s| s.test_capture.is_none()));
        assert_eq!(store.read(|s| s.filter.clone()), ReportFilter::default());
    }

    #[test]
    fn test_ingest_publishes_capture_and_flips_loading() {
        let store = ReportStore::new();
        assert!(store.ingest(&capture_json("[]")));
        assert!(!store.is_loading());
        assert!(store.read(|s| s.test_capture.is_some()));
    }

    #[test]
    fn test_ingest_of_invalid_json_keeps_loading() {
        let store = ReportStore::new();
        assert!(!store.ingest("{ not json"));
        assert!(store.is_loading());
        assert!(store.read(|s| s.test_capture.is_none()));
    }

    #[test]
    fn test_subscribers_observe_the_terminal_write() {
        let store = ReportStore::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_by_sub = Arc::clone(&seen);
        store.subscribe(move |state| {
            assert!(!state.is_loading);
            seen_by_sub.fetch_add(1, Ordering::SeqCst);
        });
        store.ingest(&capture_json("[]"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_filter_is_exposed_unchanged() {
        let store = ReportStore::new();
        let filter = ReportFilter {
            test_name: "TestFoo".to_string(),
            show_passed: false,
            show_failed: true,
            show_skipped: false,
        };
        store.set_filter(filter.clone());
        assert_eq!(store.read(|s| s.filter.clone()), filter);
    }

    #[test]
    fn test_load_of_missing_page_keeps_loading() {
        let store = ReportStore::new();
        store.load(Path::new("/nonexistent/report.html"));
        assert!(store.is_loading());
    }
}

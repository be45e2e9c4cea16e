//! Report ingestion and tree materialization
//!
//! Re-ingests generated report pages: the loader retrieves and
//! decompresses the embedded payload, the tree builder derives per-node
//! default collapse state, and the store publishes the result to
//! presentation code.

pub mod loader;
pub mod store;
pub mod tree;

pub use loader::{read_report_data, LoadError};
pub use store::{ReportFilter, ReportState, ReportStore};
pub use tree::{wrap_capture, wrap_test_results, ViewTestCapture, ViewTestResult};

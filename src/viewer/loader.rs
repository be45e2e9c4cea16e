//! Report payload retrieval
//!
//! Finds the compressed payload reference embedded in a generated report
//! page, fetches the raw bytes, gunzips them, and decodes the result as
//! UTF-8 text. The callback is invoked exactly once on success and never
//! on failure; failures go to the diagnostic channel only, so callers
//! treat "callback never invoked" as the failure signal.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use scraper::{Html, Selector};
use std::io::Read as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::error;
use url::Url;

/// Element id carrying the payload reference in a report page
pub const REPORT_DATA_ID: &str = "report-data";

/// Why a report payload could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read report page {path}: {source}")]
    Page {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no payload reference element (#report-data) in report page")]
    MissingReference,
    #[error("failed to fetch report payload from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("payload is not a valid gzip stream: {0}")]
    Decompression(std::io::Error),
    #[error("decompressed payload is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// Read the report payload embedded in `page` and hand the decompressed
/// JSON text to `callback`. On any failure the callback is not invoked
/// and the error is reported to the diagnostic channel. Each call
/// re-fetches and re-decompresses.
pub fn read_report_data(page: &Path, callback: impl FnOnce(String)) {
    match fetch_report_text(page) {
        Ok(text) => callback(text),
        Err(err) => error!("failed to load report payload: {err}"),
    }
}

/// The fallible pipeline behind [`read_report_data`]:
/// locate reference, fetch, decompress, decode.
pub fn fetch_report_text(page: &Path) -> Result<String, LoadError> {
    let html = std::fs::read_to_string(page).map_err(|source| LoadError::Page {
        path: page.to_path_buf(),
        source,
    })?;
    let href = find_payload_reference(&html).ok_or(LoadError::MissingReference)?;
    let raw = fetch_payload_bytes(page, &href)?;
    decompress_payload(&raw)
}

/// Extract the payload URL from the page's `link#report-data` element
fn find_payload_reference(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("link#{REPORT_DATA_ID}")).ok()?;
    let element = document.select(&selector).next()?;
    element.value().attr("href").map(str::to_owned)
}

/// Resolve the reference and retrieve the raw payload bytes
fn fetch_payload_bytes(page: &Path, href: &str) -> Result<Vec<u8>, LoadError> {
    if let Some(rest) = href.strip_prefix("data:") {
        return decode_data_uri(rest);
    }

    if let Ok(url) = Url::parse(href) {
        return match url.scheme() {
            "http" | "https" => fetch_http(&url),
            "file" => {
                let path = url.to_file_path().map_err(|_| LoadError::Fetch {
                    url: href.to_string(),
                    reason: "invalid file URL".to_string(),
                })?;
                std::fs::read(&path).map_err(|e| LoadError::Fetch {
                    url: href.to_string(),
                    reason: e.to_string(),
                })
            }
            other => Err(LoadError::Fetch {
                url: href.to_string(),
                reason: format!("unsupported scheme: {other}"),
            }),
        };
    }

    // Relative reference: resolve against the page's directory.
    let path = page.parent().unwrap_or(Path::new(".")).join(href);
    std::fs::read(&path).map_err(|e| LoadError::Fetch {
        url: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Decode `mediatype;base64,<payload>` (the part after `data:`)
fn decode_data_uri(rest: &str) -> Result<Vec<u8>, LoadError> {
    let fetch_err = |reason: String| LoadError::Fetch {
        url: "data:".to_string(),
        reason,
    };
    let payload = rest
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| fetch_err("missing base64 payload".to_string()))?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| fetch_err(e.to_string()))
}

fn fetch_http(url: &Url) -> Result<Vec<u8>, LoadError> {
    let fetch_err = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };
    let response = reqwest::blocking::get(url.as_str())
        .and_then(|r| r.error_for_status())
        .map_err(|e| fetch_err(e.to_string()))?;
    let bytes = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
    Ok(bytes.to_vec())
}

fn decompress_payload(raw: &[u8]) -> Result<String, LoadError> {
    let mut decoder = GzDecoder::new(raw);
    let mut buf = Vec::new();
    decoder
        .read_to_end(&mut buf)
        .map_err(LoadError::Decompression)?;
    Ok(String::from_utf8(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write as _;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn page_with_data_uri(payload: &[u8]) -> String {
        format!(
            "<!DOCTYPE html><html><head>\
             <link id=\"report-data\" type=\"application/gzip\" \
             href=\"data:application/gzip;base64,{}\">\
             </head><body></body></html>",
            STANDARD.encode(payload)
        )
    }

    fn write_page(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("report.html");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_loads_embedded_data_uri_payload() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(&gzip(b"{\"ok\":true}")));
        let text = fetch_report_text(&page).unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[test]
    fn test_loads_relative_file_payload() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("payload.gz"), gzip(b"hello")).unwrap();
        let page = write_page(
            &dir,
            "<html><head><link id=\"report-data\" href=\"payload.gz\"></head></html>",
        );
        assert_eq!(fetch_report_text(&page).unwrap(), "hello");
    }

    #[test]
    fn test_missing_page_is_a_retrieval_failure() {
        let err = fetch_report_text(Path::new("/nonexistent/report.html")).unwrap_err();
        assert!(matches!(err, LoadError::Page { .. }));
    }

    #[test]
    fn test_missing_reference_element_is_a_retrieval_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, "<html><head></head><body></body></html>");
        let err = fetch_report_text(&page).unwrap_err();
        assert!(matches!(err, LoadError::MissingReference));
    }

    #[test]
    fn test_malformed_base64_is_a_fetch_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(
            &dir,
            "<html><head><link id=\"report-data\" \
             href=\"data:application/gzip;base64,@@not-base64@@\"></head></html>",
        );
        let err = fetch_report_text(&page).unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn test_malformed_gzip_is_a_decompression_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(b"definitely not gzip"));
        let err = fetch_report_text(&page).unwrap_err();
        assert!(matches!(err, LoadError::Decompression(_)));
    }

    #[test]
    fn test_invalid_utf8_is_a_decode_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(&gzip(&[0xff, 0xfe, 0xfd])));
        let err = fetch_report_text(&page).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_callback_runs_exactly_once_on_success() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(&gzip(b"payload")));
        let mut calls = 0;
        read_report_data(&page, |text| {
            calls += 1;
            assert_eq!(text, "payload");
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_callback_never_runs_on_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(b"corrupt"));
        let mut invoked = false;
        read_report_data(&page, |_| invoked = true);
        assert!(!invoked);
    }

    #[test]
    fn test_repeated_calls_refetch() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = write_page(&dir, &page_with_data_uri(&gzip(b"one")));
        assert_eq!(fetch_report_text(&page).unwrap(), "one");
        std::fs::write(&page, page_with_data_uri(&gzip(b"two"))).unwrap();
        assert_eq!(fetch_report_text(&page).unwrap(), "two");
    }
}

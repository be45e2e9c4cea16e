//! HTML reporter: self-contained report page with an embedded payload
//!
//! The capture is serialized to JSON, gzip-compressed, and embedded as a
//! base64 `data:` URI in a `<link id="report-data">` element, which is the
//! element the viewer's payload loader reads back. The page body is a
//! static `<details>` tree that honors the computed default collapse
//! state, so the report is usable in a browser without any script.

use crate::viewer::loader::REPORT_DATA_ID;
use crate::viewer::tree::{wrap_capture, ViewTestResult};
use crate::{TestCapture, TestResult};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write as _;

/// Escapes a string for embedding in HTML text or attribute values
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reporter that generates a self-contained HTML report page
pub struct HtmlReporter;

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    /// Generate the full report page
    pub fn report(&self, capture: &TestCapture) -> Result<String> {
        let payload = Self::encode_payload(capture)?;
        let view = wrap_capture(capture.clone());
        let title = if capture.title.is_empty() {
            "Test Report"
        } else {
            &capture.title
        };

        let mut html = String::with_capacity(payload.len() + 16_384);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        html.push_str(&format!(
            "<link id=\"{REPORT_DATA_ID}\" type=\"application/gzip\" \
             href=\"data:application/gzip;base64,{payload}\">\n"
        ));
        html.push_str(Self::template_style());
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!("<header><h1>{}</h1>", escape_html(title)));
        if let (Some(started), Some(ended)) = (view.data.started_at, view.data.ended_at) {
            html.push_str(&format!(
                "<span class=\"meta\">{} – {}</span>",
                started.format("%Y-%m-%d %H:%M:%S UTC"),
                ended.format("%Y-%m-%d %H:%M:%S UTC"),
            ));
        }
        html.push_str("</header>\n<main>\n");
        if view.tests.is_empty() {
            html.push_str("<div class=\"empty\">No tests were captured.</div>\n");
        }
        for node in &view.tests {
            Self::push_node(&mut html, node);
        }
        html.push_str("</main>\n</body>\n</html>\n");
        Ok(html)
    }

    /// gzip + base64 the capture JSON
    fn encode_payload(capture: &TestCapture) -> Result<String> {
        let json = serde_json::to_vec(capture).context("serialize capture")?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).context("compress capture")?;
        let compressed = encoder.finish().context("compress capture")?;
        Ok(STANDARD.encode(compressed))
    }

    fn push_node(html: &mut String, node: &ViewTestResult) {
        let status = Self::status_class(&node.data);
        let label = Self::node_label(&node.data, status);

        if node.tests.is_empty() {
            html.push_str(&format!("<div class=\"test leaf\">{label}"));
            Self::push_output(html, &node.data);
            html.push_str("</div>\n");
            return;
        }

        let open = if node.collapsed { "" } else { " open" };
        html.push_str(&format!(
            "<details class=\"test\"{open}><summary>{label}</summary>\n"
        ));
        Self::push_output(html, &node.data);
        for child in &node.tests {
            Self::push_node(html, child);
        }
        html.push_str("</details>\n");
    }

    fn node_label(data: &TestResult, status: &str) -> String {
        let elapsed = if data.done {
            format!("<span class=\"elapsed\">{:.3}s</span>", data.elapsed)
        } else {
            String::new()
        };
        format!(
            "<span class=\"badge {status}\">{}</span>\
             <span class=\"name\">{}</span>{elapsed}",
            status.to_uppercase(),
            escape_html(data.display_name()),
        )
    }

    fn push_output(html: &mut String, data: &TestResult) {
        if data.output.is_empty() {
            return;
        }
        let text: String = data.output.iter().map(|o| o.text.as_str()).collect();
        html.push_str(&format!("<pre class=\"output\">{}</pre>\n", escape_html(&text)));
    }

    fn status_class(data: &TestResult) -> &'static str {
        if !data.done {
            "run"
        } else if data.skipped {
            "skip"
        } else if data.passed {
            "pass"
        } else {
            "fail"
        }
    }

    fn template_style() -> &'static str {
        r##"<style>
:root{--bg:#0d0d11;--surface:#16161b;--border:#2a2a32;--text:#e4e4e7;--muted:#71717a;--green:#22c55e;--yellow:#eab308;--blue:#3b82f6;--red:#ef4444;--radius:8px}
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Oxygen,sans-serif;background:var(--bg);color:var(--text);line-height:1.5;min-height:100vh}
header{padding:1.25rem 1.5rem;border-bottom:1px solid var(--border);display:flex;align-items:baseline;gap:1rem}
header h1{font-size:1.125rem;font-weight:700}
header .meta{font-size:.8125rem;color:var(--muted)}
main{padding:1rem 1.5rem;max-width:960px}
.test{margin:.25rem 0;border-left:2px solid var(--border);padding-left:.75rem}
.test.leaf{padding-top:.125rem;padding-bottom:.125rem}
summary{cursor:pointer;user-select:none;padding:.25rem 0}
summary::marker{color:var(--muted)}
.badge{font-size:.6875rem;font-weight:700;padding:.1rem .375rem;border-radius:4px;margin-right:.5rem}
.badge.pass{background:rgba(34,197,94,.15);color:var(--green)}
.badge.fail{background:rgba(239,68,68,.15);color:var(--red)}
.badge.skip{background:rgba(59,130,246,.12);color:var(--blue)}
.badge.run{background:rgba(234,179,8,.12);color:var(--yellow)}
.name{font-size:.875rem}
.elapsed{font-size:.75rem;color:var(--muted);margin-left:.5rem;font-variant-numeric:tabular-nums}
.output{background:var(--surface);border:1px solid var(--border);border-radius:var(--radius);padding:.5rem .75rem;margin:.25rem 0;font-size:.75rem;overflow-x:auto;color:var(--muted);white-space:pre-wrap}
.empty{text-align:center;padding:3rem 1rem;color:var(--muted);font-size:.875rem}
</style>
"##
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

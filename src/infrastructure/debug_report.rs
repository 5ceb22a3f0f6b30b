//! Per-page debug artifacts
//!
//! For each processed page: the raw HTML snapshot, a JSON report with the
//! record and per-field provenance, and a small HTML summary for eyeballing.

use crate::domain::course::Column;
use crate::infrastructure::parsing::AssembledRecord;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Replace characters outside `[A-Za-z0-9._-]` and cap the length
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    cleaned.chars().take(100).collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Writes debug artifacts into one directory
#[derive(Debug, Clone)]
pub struct DebugReporter {
    dir: PathBuf,
}

impl DebugReporter {
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create debug directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `NNN_raw.html`, `NNN_report.json` and `NNN_debug.html`
    pub async fn write(&self, index: usize, url: &str, html: &str, assembled: &AssembledRecord) -> Result<Vec<PathBuf>> {
        let raw_path = self.dir.join(sanitize_filename(&format!("{index:03}_raw.html")));
        let report_path = self.dir.join(sanitize_filename(&format!("{index:03}_report.json")));
        let summary_path = self.dir.join(sanitize_filename(&format!("{index:03}_debug.html")));

        let report = json!({
            "url": url,
            "record": assembled.record,
            "provenance": assembled.provenance(),
            "instructors": assembled.metadata.instructors,
        });
        let report_text = serde_json::to_string_pretty(&report).context("Failed to serialize debug report")?;

        fs::write(&raw_path, html)
            .await
            .with_context(|| format!("Failed to write {}", raw_path.display()))?;
        fs::write(&report_path, report_text)
            .await
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        fs::write(&summary_path, render_summary(url, assembled))
            .await
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;

        debug!("Debug artifacts for {} written to {}", url, self.dir.display());
        Ok(vec![raw_path, report_path, summary_path])
    }
}

fn render_summary(url: &str, assembled: &AssembledRecord) -> String {
    let mut rows = String::new();
    for column in Column::ORDER {
        let _ = writeln!(
            rows,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(column.header()),
            escape_html(&assembled.record.cell(column))
        );
    }

    let mut legend = String::new();
    for provenance in assembled.provenance() {
        let strategies: Vec<String> = provenance
            .hits
            .iter()
            .map(|h| {
                format!(
                    "{}{} ({} hits)",
                    escape_html(&h.label),
                    if h.accepted { " ✓" } else { "" },
                    h.hits
                )
            })
            .collect();
        let _ = writeln!(
            legend,
            "<li><strong>{}</strong>: {} <code>{}</code><br><small>{}</small></li>",
            provenance.field,
            escape_html(provenance.label.as_deref().unwrap_or("default")),
            escape_html(&provenance.snippet.chars().take(400).collect::<String>()),
            strategies.join(", ")
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang='en'><head><meta charset='utf-8'><title>Debug: {url}</title>\
         <style>body{{font-family:system-ui,sans-serif;margin:16px}}th{{text-align:left;padding:4px 8px;vertical-align:top}}\
         td{{padding:4px 8px;white-space:pre-wrap}}code{{color:#475569}}</style></head>\n\
         <body><h1>{url}</h1>\n<h2>Extracted summary</h2><table>\n{rows}</table>\n\
         <h2>Field provenance</h2><ul>\n{legend}</ul></body></html>\n",
        url = escape_html(url),
    )
}

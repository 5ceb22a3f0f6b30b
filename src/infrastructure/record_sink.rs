//! Record sinks
//!
//! [`RecordSink`] consumes batches of finished records against the fixed
//! column schema. [`TsvFileSink`] appends tab-separated rows to a file,
//! writing the header when the file is new. [`BatchingSink`] buffers records
//! and degrades to extraction-only when the underlying sink fails.

use crate::domain::course::{Column, CourseRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

#[async_trait]
pub trait RecordSink: Send {
    async fn append(&mut self, records: &[CourseRecord]) -> Result<()>;
}

const SEPARATOR: char = '\t';

fn needs_quotes(cell: &str) -> bool {
    cell.contains(SEPARATOR) || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
}

/// One TSV line, quoting cells that contain separators, quotes or newlines
pub fn format_row(cells: &[String]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
        }
        if needs_quotes(cell) {
            line.push('"');
            line.push_str(&cell.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(cell);
        }
    }
    line.push('\n');
    line
}

fn header_line() -> String {
    let headers: Vec<String> = Column::headers().into_iter().map(String::from).collect();
    format_row(&headers)
}

/// Appends records to a TSV file
#[derive(Debug)]
pub struct TsvFileSink {
    path: PathBuf,
}

impl TsvFileSink {
    /// Open the destination, creating it with a header row when absent or empty
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let existing = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read sink file {}", path.display())),
        };

        let header = header_line();
        if existing.trim().is_empty() {
            fs::write(&path, &header)
                .await
                .with_context(|| format!("Failed to write header to {}", path.display()))?;
            info!("Created sink file {}", path.display());
        } else if existing.lines().next().map(|l| format!("{l}\n")) != Some(header) {
            warn!("Sink file {} has an unexpected header; appending anyway", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for TsvFileSink {
    async fn append(&mut self, records: &[CourseRecord]) -> Result<()> {
        let mut text = String::new();
        for record in records {
            text.push_str(&format_row(&record.row()));
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open sink file {}", self.path.display()))?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Counters reported when a batching sink finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub written: usize,
    pub dropped: usize,
}

/// Buffers records and hands them to the inner sink in fixed-size batches
pub struct BatchingSink {
    inner: Option<Box<dyn RecordSink>>,
    buffer: Vec<CourseRecord>,
    batch_size: usize,
    stats: SinkStats,
}

impl BatchingSink {
    pub fn new(inner: Box<dyn RecordSink>, batch_size: usize) -> Self {
        Self {
            inner: Some(inner),
            buffer: Vec::new(),
            batch_size: batch_size.max(1),
            stats: SinkStats::default(),
        }
    }

    /// A sink that only counts; used when persistence is disabled or unavailable
    pub fn disabled() -> Self {
        Self {
            inner: None,
            buffer: Vec::new(),
            batch_size: 1,
            stats: SinkStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn push(&mut self, record: CourseRecord) {
        if self.inner.is_none() {
            self.stats.dropped += 1;
            return;
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// Write buffered records. A failure disables the sink for the rest of the run.
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        let Some(inner) = self.inner.as_mut() else {
            self.stats.dropped += batch.len();
            return;
        };
        let result = inner.append(&batch).await;
        match result {
            Ok(()) => {
                info!("Appended {} rows to sink", batch.len());
                self.stats.written += batch.len();
            }
            Err(e) => {
                warn!("Sink append failed, continuing without persistence: {:#}", e);
                self.stats.dropped += batch.len();
                self.inner = None;
            }
        }
    }

    pub async fn finish(mut self) -> SinkStats {
        self.flush().await;
        self.stats
    }
}

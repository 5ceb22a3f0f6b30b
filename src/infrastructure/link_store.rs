//! Durable, append-only link store
//!
//! One URL per line. Run boundaries are annotated with human-readable
//! header/footer lines which are never read back as data. Every append is
//! flushed and synced before returning, so an interrupted run loses at most
//! the page in flight.

use crate::domain::course::LinkEntry;
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Counts reported in the run footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub new_written: usize,
    pub unique_all: usize,
    pub duration: Duration,
}

/// Whether a stored line is a data line
pub fn is_data_line(line: &str) -> bool {
    line.trim_start().starts_with("http")
}

/// Read stored links in file order, skipping annotations, comments and duplicates.
/// Lines are re-normalized with `strip_params` so older entries dedup against new ones.
///
/// A missing file is an empty store.
pub fn read_links(path: &Path, strip_params: &[String]) -> Result<Vec<LinkEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to open link store {}", path.display())),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read link store {}", path.display()))?;
        if !is_data_line(&line) {
            continue;
        }
        let entry = LinkEntry::from_stored(&line, strip_params);
        if seen.insert(entry.clone()) {
            links.push(entry);
        }
    }
    Ok(links)
}

/// Process-wide set of already emitted links backed by a file
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    seen: HashSet<LinkEntry>,
    run_started: Option<Instant>,
    run_written: usize,
}

impl LinkStore {
    /// Open the store, loading every previously written link
    pub fn open(path: impl Into<PathBuf>, strip_params: &[String]) -> Result<Self> {
        let path = path.into();
        let seen = Self::load(&path, strip_params)?;
        info!("Link store {} holds {} links", path.display(), seen.len());
        Ok(Self {
            path,
            seen,
            run_started: None,
            run_written: 0,
        })
    }

    pub fn load(path: &Path, strip_params: &[String]) -> Result<HashSet<LinkEntry>> {
        Ok(read_links(path, strip_params)?.into_iter().collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, entry: &LinkEntry) -> bool {
        self.seen.contains(entry)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Links written since `begin_run`
    pub fn run_written(&self) -> usize {
        self.run_written
    }

    /// Write the entries not already stored, in order, and sync before returning
    pub fn append<'a>(&mut self, entries: impl IntoIterator<Item = &'a LinkEntry>) -> Result<usize> {
        let fresh: Vec<&LinkEntry> = {
            let mut batch = HashSet::new();
            entries
                .into_iter()
                .filter(|e| !self.seen.contains(*e) && batch.insert(*e))
                .collect()
        };
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut file = self.open_for_append()?;
        let mut buffer = String::new();
        for entry in &fresh {
            buffer.push_str(entry.as_str());
            buffer.push('\n');
        }
        self.write_durably(&mut file, &buffer)?;

        let written = fresh.len();
        self.seen.extend(fresh.into_iter().cloned());
        self.run_written += written;
        debug!("Appended {} new links to {}", written, self.path.display());
        Ok(written)
    }

    /// Write the run header and start the run clock
    pub fn begin_run(&mut self) -> Result<()> {
        let line = format!("\n---- RUN START [{}] ----\n", Local::now().format(TIMESTAMP_FORMAT));
        let mut file = self.open_for_append()?;
        self.write_durably(&mut file, &line)?;
        self.run_started = Some(Instant::now());
        self.run_written = 0;
        Ok(())
    }

    /// Write the run footer; `unique_all` is the number of distinct links seen this run
    pub fn end_run(&mut self, unique_all: usize) -> Result<RunSummary> {
        let duration = self.run_started.take().map(|t| t.elapsed()).unwrap_or_default();
        let summary = RunSummary {
            new_written: self.run_written,
            unique_all,
            duration,
        };
        let line = format!(
            "---- RUN END   [{}] (new_written={}, unique_all={}, duration={:.2}s) ----\n",
            Local::now().format(TIMESTAMP_FORMAT),
            summary.new_written,
            summary.unique_all,
            duration.as_secs_f64()
        );
        let mut file = self.open_for_append()?;
        self.write_durably(&mut file, &line)?;
        Ok(summary)
    }

    fn open_for_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open link store {}", self.path.display()))?;
        Self::terminate_last_line(&mut file)?;
        Ok(file)
    }

    /// Keep one record per line even if a previous writer died mid-line
    fn terminate_last_line(file: &mut File) -> Result<()> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }
        file.seek(SeekFrom::Start(len - 1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_durably(&self, file: &mut File, text: &str) -> Result<()> {
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data())
            .with_context(|| format!("Failed to write link store {}", self.path.display()))
    }
}

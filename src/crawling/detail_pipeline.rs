//! Detail-page pipeline: fetch each stored URL, assemble its record and hand
//! it to the sink, one page at a time. A failing URL is logged and counted,
//! never fatal to the rest of the run.

use crate::crawling::pagination::pause;
use crate::domain::course::{CourseRecord, LinkEntry};
use crate::infrastructure::debug_report::DebugReporter;
use crate::infrastructure::http_client::{FetchError, HttpClient};
use crate::infrastructure::parsing::{AssembledRecord, RecordAssembler};
use crate::infrastructure::record_sink::{BatchingSink, SinkStats};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub sink: SinkStats,
    pub debug_pages: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

pub struct DetailPipeline {
    client: Arc<HttpClient>,
    assembler: RecordAssembler,
    request_delay: Duration,
}

impl DetailPipeline {
    pub fn new(client: Arc<HttpClient>, assembler: RecordAssembler, request_delay: Duration) -> Self {
        Self {
            client,
            assembler,
            request_delay,
        }
    }

    pub fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }

    /// Process every URL in order. The sink is always flushed before returning.
    pub async fn run(
        &self,
        urls: &[LinkEntry],
        mut sink: BatchingSink,
        reporter: Option<&DebugReporter>,
        cancellation_token: &CancellationToken,
    ) -> PipelineSummary {
        let started = Instant::now();
        let mut summary = PipelineSummary {
            total: urls.len(),
            ..PipelineSummary::default()
        };
        info!("Scraping {} course pages (sink enabled: {})", urls.len(), sink.is_enabled());

        for (i, url) in urls.iter().enumerate() {
            let index = i + 1;
            if cancellation_token.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            info!("[{}/{}] Fetching: {}", index, urls.len(), url);

            match self.process(index, url, reporter, cancellation_token).await {
                Ok((record, reported)) => {
                    summary.processed += 1;
                    if reported {
                        summary.debug_pages += 1;
                    }
                    sink.push(record).await;
                }
                Err(FetchError::Cancelled { .. }) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Error processing {}: {}", url, e);
                }
            }

            if !pause(self.request_delay, cancellation_token).await {
                summary.cancelled = true;
                break;
            }
        }

        summary.sink = sink.finish().await;
        summary.duration = started.elapsed();
        info!(
            "Scrape finished: processed={}, failed={}, written={}, dropped={}, cancelled={}",
            summary.processed, summary.failed, summary.sink.written, summary.sink.dropped, summary.cancelled
        );
        summary
    }

    async fn process(
        &self,
        index: usize,
        url: &LinkEntry,
        reporter: Option<&DebugReporter>,
        cancellation_token: &CancellationToken,
    ) -> Result<(CourseRecord, bool), FetchError> {
        let page = self.client.fetch(url.as_str(), cancellation_token).await?;
        let assembled = self.assembler.assemble(url.as_str(), &page.body);
        log_focus(&assembled);

        let mut reported = false;
        if let Some(reporter) = reporter {
            match reporter.write(index, url.as_str(), &page.body, &assembled).await {
                Ok(_) => reported = true,
                Err(e) => warn!("Debug report for {} failed: {:#}", url, e),
            }
        }
        Ok((assembled.record, reported))
    }
}

fn log_focus(assembled: &AssembledRecord) {
    let record = &assembled.record;
    info!(
        "Extracted '{}' (rating={}, duration='{}', level='{}', provider='{}')",
        record.title,
        record.rating.map_or_else(|| "N/A".to_string(), |r| r.to_string()),
        record.duration,
        record.prerequisite_level,
        record.provider
    );
}

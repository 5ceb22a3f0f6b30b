//! Application use cases
//!
//! Wires configuration into the infrastructure pieces and runs the two
//! stages: harvesting course links into the link store, and scraping the
//! stored URLs into records.

use crate::crawling::{DetailPipeline, HarvestSummary, Harvester, PipelineSummary};
use crate::domain::course::LinkEntry;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::debug_report::DebugReporter;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::link_store::{read_links, LinkStore};
use crate::infrastructure::page_session::HttpPageSession;
use crate::infrastructure::parsing::RecordAssembler;
use crate::infrastructure::record_sink::{BatchingSink, RecordSink, TsvFileSink};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Harvest course links with the HTTP page session
pub async fn harvest_links(config: &AppConfig, cancellation_token: &CancellationToken) -> Result<HarvestSummary> {
    let client = Arc::new(HttpClient::new(config.scrape.to_http_config())?);
    let mut session = HttpPageSession::new(client, cancellation_token.clone());
    if let Some(param) = &config.harvest.page_param {
        session = session.with_page_param(param.clone());
    }

    let harvester = Harvester::new(config.harvest.clone(), &config.selectors)?;
    let mut store = LinkStore::open(&config.harvest.link_store_path, &config.harvest.strip_params)?;
    harvester.run(&mut session, &mut store, cancellation_token).await
}

/// Build the record assembler from configured selector tables and phrase lists
pub fn build_assembler(config: &AppConfig) -> Result<RecordAssembler> {
    RecordAssembler::from_config(
        &config.selectors.detail,
        &config.phrases,
        &config.scrape.default_provider,
        config.scrape.max_cell_len,
    )
    .context("Invalid detail-page configuration")
}

/// Open the configured sink, degrading to extraction-only when it cannot be opened
pub async fn open_sink(config: &AppConfig) -> BatchingSink {
    if !config.sink.enabled {
        info!("Record sink disabled");
        return BatchingSink::disabled();
    }
    match TsvFileSink::open(&config.sink.path).await {
        Ok(sink) => {
            let inner: Box<dyn RecordSink> = Box::new(sink);
            BatchingSink::new(inner, config.sink.batch_size)
        }
        Err(e) => {
            warn!("Record sink disabled due to: {:#}", e);
            BatchingSink::disabled()
        }
    }
}

/// Fetch and assemble every stored URL
pub async fn scrape_records(config: &AppConfig, cancellation_token: &CancellationToken) -> Result<PipelineSummary> {
    let urls: Vec<LinkEntry> = read_links(&config.scrape.urls_path, &config.harvest.strip_params)?;
    if urls.is_empty() {
        warn!("No URLs found in {}", config.scrape.urls_path.display());
    }

    let client = Arc::new(HttpClient::new(config.scrape.to_http_config())?);
    let pipeline = DetailPipeline::new(
        client,
        build_assembler(config)?,
        Duration::from_millis(config.scrape.request_delay_ms),
    );

    let reporter = if config.debug.enabled {
        match DebugReporter::create(&config.debug.dir).await {
            Ok(reporter) => Some(reporter),
            Err(e) => {
                warn!("Debug output disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let sink = open_sink(config).await;
    Ok(pipeline.run(&urls, sink, reporter.as_ref(), cancellation_token).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_builds_assembler() {
        assert!(build_assembler(&AppConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unopenable_sink_degrades() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let mut config = AppConfig::default();
        config.sink.path = blocker.join("records.tsv");
        assert!(!open_sink(&config).await.is_enabled());

        config.sink.enabled = false;
        assert!(!open_sink(&config).await.is_enabled());
    }
}

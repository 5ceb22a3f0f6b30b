use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use course_harvest_lib::application::{harvest_links, scrape_records};
use course_harvest_lib::infrastructure::config::{AppConfig, ConfigManager};
use course_harvest_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "course-harvest", version, about = "Harvest course links and scrape course pages into records")]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk category listings and append new course links to the link store
    Harvest(HarvestArgs),
    /// Fetch stored course URLs and write one record per page
    Scrape(ScrapeArgs),
    /// Harvest, then scrape
    Run {
        #[command(flatten)]
        harvest: HarvestArgs,
        #[command(flatten)]
        scrape: ScrapeArgs,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct HarvestArgs {
    /// Upper bound on pages visited per category
    #[arg(long)]
    max_pages: Option<u32>,

    /// Category listing URL to harvest instead of discovering categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Link store file
    #[arg(long)]
    links: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ScrapeArgs {
    /// File with course URLs, one per line
    #[arg(long)]
    urls: Option<PathBuf>,

    /// Extract only; do not write records to the sink
    #[arg(long)]
    no_sink: bool,

    /// Write per-page debug artifacts into this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

impl HarvestArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(max_pages) = self.max_pages {
            config.harvest.max_pages = max_pages;
        }
        if !self.categories.is_empty() {
            config.harvest.categories.clone_from(&self.categories);
        }
        if let Some(links) = &self.links {
            config.harvest.link_store_path.clone_from(links);
            config.scrape.urls_path.clone_from(links);
        }
    }
}

impl ScrapeArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(urls) = &self.urls {
            config.scrape.urls_path.clone_from(urls);
        }
        if self.no_sink {
            config.sink.enabled = false;
        }
        if let Some(dir) = &self.debug_dir {
            config.debug.enabled = true;
            config.debug.dir.clone_from(dir);
        }
    }
}

/// Cancel the token on Ctrl-C so every stage can flush and write its footer
fn install_shutdown_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, finishing the current step");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    if let Command::InitConfig { force } = cli.command {
        if manager.initialize(force).await? {
            println!("Wrote default configuration to {}", manager.config_path().display());
        } else {
            println!("Configuration already exists at {}", manager.config_path().display());
        }
        return Ok(());
    }

    let mut config = manager.load_config().await?;
    match &cli.command {
        Command::Harvest(args) => args.apply(&mut config),
        Command::Scrape(args) => args.apply(&mut config),
        Command::Run { harvest, scrape } => {
            harvest.apply(&mut config);
            scrape.apply(&mut config);
        }
        Command::InitConfig { .. } => {}
    }

    init_logging_with_config(config.logging.clone())?;
    log_system_info();

    let token = CancellationToken::new();
    install_shutdown_handler(token.clone());

    if matches!(cli.command, Command::Harvest(_) | Command::Run { .. }) {
        let summary = harvest_links(&config, &token).await?;
        info!(
            "Harvest complete: {} categories, {} new links, {} unique this run",
            summary.categories.len(),
            summary.run.new_written,
            summary.run.unique_all
        );
        if summary.cancelled {
            return Ok(());
        }
    }

    if matches!(cli.command, Command::Scrape(_) | Command::Run { .. }) {
        let summary = scrape_records(&config, &token).await?;
        info!(
            "Scrape complete: {}/{} processed, {} failed, {} rows written",
            summary.processed, summary.total, summary.failed, summary.sink.written
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "course-harvest",
            "--config",
            "custom.json",
            "run",
            "--max-pages",
            "3",
            "--category",
            "/browse/data-science",
            "--no-sink",
            "--debug-dir",
            "dbg",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));

        let mut config = AppConfig::default();
        let Command::Run { harvest, scrape } = cli.command else {
            panic!("expected run");
        };
        harvest.apply(&mut config);
        scrape.apply(&mut config);
        assert_eq!(config.harvest.max_pages, 3);
        assert_eq!(config.harvest.categories, vec!["/browse/data-science".to_string()]);
        assert!(!config.sink.enabled);
        assert!(config.debug.enabled);
        assert_eq!(config.debug.dir, PathBuf::from("dbg"));
    }

    #[test]
    fn test_links_override_feeds_scrape_stage() {
        let cli = Cli::try_parse_from(["course-harvest", "harvest", "--links", "out/links.txt"]).unwrap();
        let mut config = AppConfig::default();
        if let Command::Harvest(args) = cli.command {
            args.apply(&mut config);
        }
        assert_eq!(config.scrape.urls_path, PathBuf::from("out/links.txt"));
    }
}

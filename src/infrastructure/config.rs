//! Configuration infrastructure
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then `COURSE_HARVEST__SECTION__KEY` environment variables. Selector tables
//! and phrase lists are plain data here and are compiled by the parsing layer.

use crate::infrastructure::http_client::HttpClientConfig;
use crate::infrastructure::parsing::{PhraseConfig, SelectorConfig};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

const ENV_PREFIX: &str = "COURSE_HARVEST";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub harvest: HarvestConfig,
    pub scrape: ScrapeConfig,
    pub sink: SinkConfig,
    pub debug: DebugConfig,
    pub logging: LoggingConfig,
    pub selectors: SelectorConfig,
    pub phrases: PhraseConfig,
}

/// Link harvesting: category discovery and pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Site origin used to absolutize relative links
    pub origin: String,
    /// Page listing the categories
    pub browse_url: String,
    /// Category listing URLs to harvest; discovery is skipped when non-empty
    pub categories: Vec<String>,
    /// Safety bound on pages visited per category
    pub max_pages: u32,
    pub page_delay_ms: u64,
    /// Wait after activating "next" when no reference element was captured
    pub settle_delay_ms: u64,
    pub cookie_delay_ms: u64,
    /// Bound for readiness and staleness waits
    pub wait_timeout_secs: u64,
    pub link_store_path: PathBuf,
    /// Query parameters removed during link normalization
    pub strip_params: Vec<String>,
    /// Query parameter advanced by the HTTP backend when a control has no link target
    pub page_param: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            origin: defaults::ORIGIN.to_string(),
            browse_url: defaults::BROWSE_URL.to_string(),
            categories: Vec::new(),
            max_pages: defaults::MAX_PAGES,
            page_delay_ms: defaults::PAGE_DELAY_MS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            cookie_delay_ms: defaults::COOKIE_DELAY_MS,
            wait_timeout_secs: defaults::WAIT_TIMEOUT_SECS,
            link_store_path: PathBuf::from(defaults::LINK_STORE_PATH),
            strip_params: defaults::STRIP_PARAMS.iter().map(|p| (*p).to_string()).collect(),
            page_param: Some(defaults::PAGE_PARAM.to_string()),
        }
    }
}

impl HarvestConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn cookie_delay(&self) -> Duration {
        Duration::from_millis(self.cookie_delay_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

/// Detail-page fetching and record assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// File listing the detail URLs, normally the link store itself
    pub urls_path: PathBuf,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_secs: u64,
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub requests_per_second: u32,
    /// Provider reported when a page names none
    pub default_provider: String,
    /// Longest value kept in any text cell
    pub max_cell_len: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            urls_path: PathBuf::from(defaults::LINK_STORE_PATH),
            user_agent: http.user_agent,
            accept_language: http.accept_language,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
            max_retries: defaults::MAX_RETRIES,
            requests_per_second: defaults::REQUESTS_PER_SECOND,
            default_provider: defaults::DEFAULT_PROVIDER.to_string(),
            max_cell_len: defaults::MAX_CELL_LEN,
        }
    }
}

impl ScrapeConfig {
    pub fn to_http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.user_agent.clone(),
            accept_language: self.accept_language.clone(),
            timeout_seconds: self.request_timeout_secs,
            max_requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            request_delay_ms: self.request_delay_ms,
            ..HttpClientConfig::default()
        }
    }
}

/// Record sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub batch_size: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(defaults::SINK_PATH),
            batch_size: defaults::BATCH_SIZE,
        }
    }
}

/// Per-page debug artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(defaults::DEBUG_DIR),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; next to the executable when unset
    pub directory: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "error".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving the application config
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("course-harvest");
        Ok(config_dir)
    }

    /// Manager for the default per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    /// Manager for an explicit config file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load the layered configuration. A missing file is not an error.
    pub async fn load_config(&self) -> Result<AppConfig> {
        let defaults = Config::try_from(&AppConfig::default()).context("Failed to build default configuration")?;

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(self.config_path.as_path()).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("harvest.categories")
                    .with_list_parse_key("harvest.strip_params")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", self.config_path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Configuration has an invalid shape")?;

        if self.config_path.exists() {
            info!("Loaded configuration from: {:?}", self.config_path);
        } else {
            info!("No configuration file at {:?}, using defaults", self.config_path);
        }
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Write the default configuration unless a file already exists
    pub async fn initialize(&self, overwrite: bool) -> Result<bool> {
        if self.config_path.exists() && !overwrite {
            info!("Configuration already exists: {:?}", self.config_path);
            return Ok(false);
        }
        self.save_config(&AppConfig::default()).await?;
        Ok(true)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default values shared by the config structs
pub mod defaults {
    pub const ORIGIN: &str = "https://www.coursera.org";
    pub const BROWSE_URL: &str = "https://www.coursera.org/browse";
    pub const MAX_PAGES: u32 = 500;
    pub const PAGE_DELAY_MS: u64 = 1000;
    pub const SETTLE_DELAY_MS: u64 = 2000;
    pub const COOKIE_DELAY_MS: u64 = 500;
    pub const WAIT_TIMEOUT_SECS: u64 = 20;
    pub const LINK_STORE_PATH: &str = "course_links.txt";
    pub const STRIP_PARAMS: &[&str] = &[
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "trk",
    ];
    pub const PAGE_PARAM: &str = "page";

    pub const REQUEST_TIMEOUT_SECS: u64 = 25;
    pub const REQUEST_DELAY_MS: u64 = 2000;
    pub const MAX_RETRIES: u32 = 3;
    pub const REQUESTS_PER_SECOND: u32 = 2;
    pub const DEFAULT_PROVIDER: &str = "Coursera";
    pub const MAX_CELL_LEN: usize = 5000;

    pub const SINK_PATH: &str = "course_records.tsv";
    pub const BATCH_SIZE: usize = 5;
    pub const DEBUG_DIR: &str = "debug_html";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_MAX_FILES: u32 = 5;
    pub const LOG_AUTO_CLEANUP: bool = true;
}

//! Infrastructure layer: HTML parsing, page sessions, fetching and persistence
//!
//! Everything that touches the network, the filesystem or raw markup lives
//! here. The crawling layer composes these pieces into harvest and scrape runs.

pub mod config;
pub mod debug_report;
pub mod http_client;
pub mod link_store;
pub mod logging;
pub mod page_session;
pub mod parsing;
pub mod record_sink;

pub use config::{AppConfig, ConfigManager};
pub use debug_report::DebugReporter;
pub use http_client::{FetchError, FetchedPage, HttpClient, HttpClientConfig};
pub use link_store::{read_links, LinkStore, RunSummary};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use page_session::{ActivationMethod, ElementHandle, HttpPageSession, PageSession, WaitCondition};
pub use parsing::{ParsingError, ParsingResult, RecordAssembler};
pub use record_sink::{BatchingSink, RecordSink, SinkStats, TsvFileSink};

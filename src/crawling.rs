//! Crawling layer
//!
//! - `pagination`: per-category page walk over a [`PageSession`](crate::infrastructure::PageSession)
//! - `harvester`: category discovery and the link harvest run
//! - `detail_pipeline`: fetch, assemble and persist detail records

pub mod detail_pipeline;
pub mod harvester;
pub mod pagination;

pub use detail_pipeline::{DetailPipeline, PipelineSummary};
pub use harvester::{HarvestSummary, Harvester};
pub use pagination::{CategoryProgress, PaginationController, PaginationSettings, StopReason};

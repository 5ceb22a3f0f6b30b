//! Course Harvest
//!
//! Harvests course detail links from paginated category listings into a
//! crash-resumable link store, then turns each course page into a normalized
//! record through a multi-strategy field resolution engine.

pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;

pub use domain::course::{Category, CourseRecord, Field, LinkEntry};
pub use infrastructure::config::{AppConfig, ConfigManager};

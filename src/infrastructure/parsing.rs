//! HTML parsing infrastructure for course listing and detail pages
//!
//! Locator tables and phrase lists are configuration data compiled once;
//! the field resolution engine consumes declarative field specs.

pub mod config;
pub mod error;
pub mod field_resolution;
pub mod field_specs;
pub mod link_collector;
pub mod record_assembler;
pub mod structured_data;
pub mod text;

// Re-export public types
pub use config::{Locator, NamedSelector, PhraseConfig, SelectorConfig};
pub use error::{ParsingError, ParsingResult};
pub use field_resolution::{resolve, Candidate, Document, FieldResolution, FieldSpec, Probe, Provenance, Selection};
pub use field_specs::FieldSpecs;
pub use link_collector::{CategoryCollector, LinkCollector};
pub use record_assembler::{AssembledRecord, RecordAssembler};
pub use structured_data::{extract_course_metadata, CourseMetadata};

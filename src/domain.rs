//! Domain module - catalog entities shared by the harvest and scrape stages

pub mod course;

pub use course::{Category, Column, CourseRecord, Field, LinkEntry, NOT_AVAILABLE};

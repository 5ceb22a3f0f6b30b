//! Course catalog entities: harvested links, categories and assembled records.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Sentinel rendered for any field that could not be resolved
pub const NOT_AVAILABLE: &str = "N/A";

/// A normalized absolute URL identifying one course detail page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkEntry(String);

impl LinkEntry {
    /// Resolve `href` against `origin` and strip what never identifies a record:
    /// the fragment and any query parameter named in `strip_params`.
    ///
    /// Returns `None` for unparsable or non-http(s) links.
    pub fn normalize(href: &str, origin: &Url, strip_params: &[String]) -> Option<Self> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let mut url = origin.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);

        if url.query().is_some() {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| !strip_params.iter().any(|p| p.eq_ignore_ascii_case(key)))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
        }

        Some(Self(url.to_string()))
    }

    /// A line read back from durable storage, normalized the same way as
    /// collected links; kept verbatim when it does not parse as a URL
    pub fn from_stored(line: &str, strip_params: &[String]) -> Self {
        let line = line.trim();
        Url::parse(line)
            .ok()
            .and_then(|url| Self::normalize(line, &url, strip_params))
            .unwrap_or_else(|| Self(line.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A category listing discovered on the browse page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Fields resolved from a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Category,
    Subcategory,
    Rating,
    Language,
    Duration,
    ModuleCount,
    Skills,
    Description,
    PrerequisiteLevel,
    Registrations,
    ContentOutline,
    Provider,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Title,
        Field::Category,
        Field::Subcategory,
        Field::Rating,
        Field::Language,
        Field::Duration,
        Field::ModuleCount,
        Field::Skills,
        Field::Description,
        Field::PrerequisiteLevel,
        Field::Registrations,
        Field::ContentOutline,
        Field::Provider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Category => "category",
            Field::Subcategory => "subcategory",
            Field::Rating => "rating",
            Field::Language => "language",
            Field::Duration => "duration",
            Field::ModuleCount => "module_count",
            Field::Skills => "skills",
            Field::Description => "description",
            Field::PrerequisiteLevel => "prerequisite_level",
            Field::Registrations => "registrations",
            Field::ContentOutline => "content_outline",
            Field::Provider => "provider",
        }
    }

    /// Fields whose record value is coerced to a number
    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Rating | Field::ModuleCount | Field::Registrations)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output columns, in sink order. Header names follow the original sheet layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    SourceUrl,
    Resolved(Field),
}

impl Column {
    pub const ORDER: [Column; 14] = [
        Column::SourceUrl,
        Column::Resolved(Field::Title),
        Column::Resolved(Field::Category),
        Column::Resolved(Field::Subcategory),
        Column::Resolved(Field::Rating),
        Column::Resolved(Field::Language),
        Column::Resolved(Field::Duration),
        Column::Resolved(Field::ModuleCount),
        Column::Resolved(Field::Skills),
        Column::Resolved(Field::Description),
        Column::Resolved(Field::PrerequisiteLevel),
        Column::Resolved(Field::Registrations),
        Column::Resolved(Field::ContentOutline),
        Column::Resolved(Field::Provider),
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::SourceUrl => "course_url",
            Column::Resolved(field) => match field {
                Field::Title => "title",
                Field::Category => "course_category",
                Field::Subcategory => "course_subcategory",
                Field::Rating => "rating",
                Field::Language => "language",
                Field::Duration => "Time to complete",
                Field::ModuleCount => "num_modules",
                Field::Skills => "skill_acquire",
                Field::Description => "description",
                Field::PrerequisiteLevel => "experience_required",
                Field::Registrations => "num_registered",
                Field::ContentOutline => "course content",
                Field::Provider => "offered_by",
            },
        }
    }

    pub fn headers() -> Vec<&'static str> {
        Self::ORDER.iter().map(|c| c.header()).collect()
    }
}

/// One assembled course record. Every schema field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub source_url: String,
    pub title: String,
    pub category: String,
    pub subcategory: String,
    pub rating: Option<f64>,
    pub language: String,
    pub duration: String,
    pub module_count: Option<u32>,
    pub skills: String,
    pub description: String,
    pub prerequisite_level: String,
    pub registrations: Option<u64>,
    pub content_outline: String,
    pub provider: String,
}

impl CourseRecord {
    /// Text value of a field as it is written to a sink
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Title => self.title.clone(),
            Field::Category => self.category.clone(),
            Field::Subcategory => self.subcategory.clone(),
            Field::Rating => self.rating.map(format_rating).unwrap_or_default(),
            Field::Language => self.language.clone(),
            Field::Duration => self.duration.clone(),
            Field::ModuleCount => self.module_count.map(|n| n.to_string()).unwrap_or_default(),
            Field::Skills => self.skills.clone(),
            Field::Description => self.description.clone(),
            Field::PrerequisiteLevel => self.prerequisite_level.clone(),
            Field::Registrations => self.registrations.map(|n| n.to_string()).unwrap_or_default(),
            Field::ContentOutline => self.content_outline.clone(),
            Field::Provider => self.provider.clone(),
        }
    }

    /// Cell text for a column; empty values render as the `N/A` sentinel
    pub fn cell(&self, column: Column) -> String {
        let value = match column {
            Column::SourceUrl => self.source_url.clone(),
            Column::Resolved(field) => self.value(field),
        };
        if value.trim().is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            value
        }
    }

    pub fn row(&self) -> Vec<String> {
        Column::ORDER.iter().map(|c| self.cell(*c)).collect()
    }
}

fn format_rating(rating: f64) -> String {
    let text = format!("{rating:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

//! Embedded machine-readable course metadata (JSON-LD)
//!
//! Produces the baseline the record assembler overlays with locator-based
//! results. Unparsable blocks and unexpected shapes are skipped; a page
//! without usable metadata yields an empty baseline.

use super::text::{canonicalize_duration, clean_text, has_duration_phrase};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

static JSONLD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:\d+S)?)?$").unwrap()
});

/// Course facts found in embedded metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub provider: Option<String>,
    pub rating: Option<f64>,
    pub duration: Option<String>,
    pub registrations: Option<u64>,
    pub instructors: Vec<String>,
    pub skills: Vec<String>,
}

impl CourseMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Extract course metadata from every JSON-LD block in the document.
///
/// The first non-empty value seen for a field wins.
pub fn extract_course_metadata(document: &Html) -> CourseMetadata {
    let mut meta = CourseMetadata::default();

    for script in document.select(&JSONLD_SELECTOR) {
        let raw = script.inner_html();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };
        for node in course_nodes(&value) {
            merge_course_node(node, &mut meta);
        }
    }

    meta
}

/// Flatten top-level arrays and `@graph` containers, keeping course-like objects
fn course_nodes(value: &Value) -> Vec<&Value> {
    let mut nodes = Vec::new();
    let mut stack = vec![value];
    while let Some(current) = stack.pop() {
        match current {
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) => {
                if let Some(graph) = map.get("@graph") {
                    stack.push(graph);
                } else if is_course_type(current.get("@type")) {
                    nodes.push(current);
                }
            }
            _ => {}
        }
    }
    nodes
}

fn is_course_type(ld_type: Option<&Value>) -> bool {
    match ld_type {
        None => true,
        Some(Value::String(t)) => matches!(t.as_str(), "Course" | "CreativeWork"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| matches!(t.as_str(), Some("Course" | "CreativeWork"))),
        Some(_) => false,
    }
}

fn merge_course_node(node: &Value, meta: &mut CourseMetadata) {
    fill(&mut meta.title, string_at(node, "name"));
    fill(
        &mut meta.description,
        string_at(node, "description").or_else(|| string_at(node, "about")),
    );
    fill(
        &mut meta.provider,
        entity_name(node.get("provider")).or_else(|| entity_name(node.get("author"))),
    );
    if meta.rating.is_none() {
        meta.rating = node
            .get("aggregateRating")
            .and_then(|r| r.get("ratingValue"))
            .and_then(number_of)
            .filter(|v| (0.0..=5.0).contains(v));
    }
    fill(&mut meta.duration, string_at(node, "timeRequired").and_then(|d| parse_duration(&d)));
    if meta.registrations.is_none() {
        meta.registrations = node
            .get("totalHistoricalEnrollment")
            .and_then(number_of)
            .or_else(|| {
                node.get("interactionStatistic")
                    .and_then(|s| s.get("userInteractionCount"))
                    .and_then(number_of)
            })
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64);
    }
    if meta.instructors.is_empty() {
        meta.instructors = names_of(node.get("instructor"));
    }
    if meta.skills.is_empty() {
        meta.skills = names_of(node.get("teaches"));
        if meta.skills.is_empty() {
            meta.skills = keywords_of(node.get("keywords"));
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn string_at(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

/// Name of an organization/person given as a string, object or list
fn entity_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(clean_text(s)).filter(|s| !s.is_empty()),
        Value::Object(_) => string_at(value?, "name"),
        Value::Array(items) => items.iter().find_map(|item| entity_name(Some(item))),
        _ => None,
    }
}

fn names_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|item| entity_name(Some(item))).collect(),
        Some(single) => entity_name(Some(single)).into_iter().collect(),
        None => Vec::new(),
    }
}

fn keywords_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(clean_text)
            .filter(|k| !k.is_empty())
            .collect(),
        other => names_of(other),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

/// `PT20H` style durations or free text already naming a unit
fn parse_duration(raw: &str) -> Option<String> {
    if let Some(caps) = ISO_DURATION.captures(raw) {
        let units = [(1, "week"), (2, "day"), (3, "hour"), (4, "minute")];
        return units.iter().find_map(|(group, unit)| {
            let qty: u64 = caps.get(*group)?.as_str().parse().ok()?;
            (qty > 0).then(|| format!("{qty} {unit}{}", if qty == 1 { "" } else { "s" }))
        });
    }
    has_duration_phrase(raw).then(|| canonicalize_duration(raw))
}

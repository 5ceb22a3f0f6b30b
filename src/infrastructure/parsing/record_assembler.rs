//! Record assembly: run every field spec over one document and build a
//! complete [`CourseRecord`] with provenance.

use super::config::{DetailSelectors, PhraseConfig};
use super::error::ParsingResult;
use super::field_resolution::{resolve, Candidate, Document, FieldResolution, FieldSpec, Provenance};
use super::field_specs::FieldSpecs;
use super::structured_data::{extract_course_metadata, CourseMetadata};
use super::text::truncate_chars;
use crate::domain::course::{CourseRecord, Field};
use std::collections::BTreeMap;
use tracing::debug;

/// Label reported when a field falls back to embedded metadata
pub const STRUCTURED_DATA_LABEL: &str = "structured_data";

/// A record plus everything needed to explain how it was built
#[derive(Debug, Clone)]
pub struct AssembledRecord {
    pub record: CourseRecord,
    pub resolutions: Vec<FieldResolution>,
    pub metadata: CourseMetadata,
}

impl AssembledRecord {
    pub fn provenance(&self) -> Vec<Provenance> {
        self.resolutions.iter().map(FieldResolution::provenance).collect()
    }

    pub fn resolution(&self, field: Field) -> Option<&FieldResolution> {
        self.resolutions.iter().find(|r| r.field == field)
    }
}

/// Stateless per document; safe to share across tasks
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    specs: FieldSpecs,
    max_cell_len: usize,
}

impl RecordAssembler {
    pub fn new(specs: FieldSpecs, max_cell_len: usize) -> Self {
        Self { specs, max_cell_len }
    }

    pub fn from_config(
        detail: &DetailSelectors,
        phrases: &PhraseConfig,
        default_provider: &str,
        max_cell_len: usize,
    ) -> ParsingResult<Self> {
        Ok(Self::new(FieldSpecs::build(detail, phrases, default_provider)?, max_cell_len))
    }

    pub fn specs(&self) -> &FieldSpecs {
        &self.specs
    }

    /// Parse and assemble in one step
    pub fn assemble(&self, source_url: &str, html: &str) -> AssembledRecord {
        self.assemble_document(source_url, &Document::parse(html))
    }

    pub fn assemble_document(&self, source_url: &str, document: &Document) -> AssembledRecord {
        let metadata = extract_course_metadata(document.html());
        let mut resolutions = Vec::with_capacity(Field::ALL.len());

        for spec in self.specs.iter() {
            let mut resolution = resolve(spec, document);
            if resolution.is_sentinel() {
                if let Some(baseline) = baseline_value(&metadata, spec.field) {
                    overlay_baseline(spec, &mut resolution, &baseline);
                }
            }
            debug!(
                url = source_url,
                field = %spec.field,
                winner = resolution.winner.as_deref().unwrap_or("<sentinel>"),
                "field resolved"
            );
            resolutions.push(resolution);
        }

        let values: BTreeMap<Field, String> = resolutions
            .iter()
            .map(|r| (r.field, truncate_chars(&r.value, self.max_cell_len)))
            .collect();

        AssembledRecord {
            record: build_record(source_url, &values, self.max_cell_len),
            resolutions,
            metadata,
        }
    }
}

/// Embedded metadata as raw text for a field, when the metadata covers it
fn baseline_value(metadata: &CourseMetadata, field: Field) -> Option<String> {
    match field {
        Field::Title => metadata.title.clone(),
        Field::Description => metadata.description.clone(),
        Field::Provider => metadata.provider.clone(),
        Field::Rating => metadata.rating.map(|r| r.to_string()),
        Field::Duration => metadata.duration.clone(),
        Field::Registrations => metadata.registrations.map(|n| n.to_string()),
        Field::Skills if !metadata.skills.is_empty() => Some(metadata.skills.join("; ")),
        _ => None,
    }
}

/// Baseline values pass the same filter and normalizer as located text
fn overlay_baseline(spec: &FieldSpec, resolution: &mut FieldResolution, baseline: &str) {
    let accepted = (spec.filter)(baseline);
    let value = accepted
        .as_deref()
        .map(|a| (spec.normalizer)(a))
        .filter(|v| !v.trim().is_empty());

    resolution.candidates.push(Candidate {
        label: STRUCTURED_DATA_LABEL.to_string(),
        raw: Some(baseline.to_string()),
        accepted: accepted.filter(|_| value.is_some()),
        score: None,
        hits: 1,
    });
    if let Some(value) = value {
        resolution.value = value;
        resolution.winner = Some(STRUCTURED_DATA_LABEL.to_string());
    }
}

fn build_record(source_url: &str, values: &BTreeMap<Field, String>, max_cell_len: usize) -> CourseRecord {
    let text = |field: Field| values.get(&field).cloned().unwrap_or_default();
    CourseRecord {
        source_url: truncate_chars(source_url, max_cell_len),
        title: text(Field::Title),
        category: text(Field::Category),
        subcategory: text(Field::Subcategory),
        rating: coerce_number::<f64>(&text(Field::Rating)).filter(|r| (0.0..=5.0).contains(r)),
        language: text(Field::Language),
        duration: text(Field::Duration),
        module_count: coerce_number(&text(Field::ModuleCount)),
        skills: text(Field::Skills),
        description: text(Field::Description),
        prerequisite_level: text(Field::PrerequisiteLevel),
        registrations: coerce_number(&text(Field::Registrations)),
        content_outline: text(Field::ContentOutline),
        provider: text(Field::Provider),
    }
}

/// Invalid, empty or sentinel text coerces to `None`
fn coerce_number<T: std::str::FromStr>(text: &str) -> Option<T> {
    text.trim().replace(',', "").parse().ok()
}

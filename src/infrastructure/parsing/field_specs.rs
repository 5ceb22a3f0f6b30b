//! Concrete field specs for course detail pages
//!
//! Builds one [`FieldSpec`] per record field from the configured locator
//! tables and phrase lists. Selectors and phrases are compiled here, once.

use super::config::{DetailSelectors, NamedSelector, PhraseConfig};
use super::error::ParsingResult;
use super::field_resolution::{
    compile_selector, compile_selectors, element_text, Document, FieldSpec, Probe,
};
use super::structured_data::extract_course_metadata;
use super::text::{
    canonicalize_duration, clean_text, find_duration_phrase, find_level, first_number,
    fix_text_encoding, has_duration_phrase, is_duration, is_level, is_modules_line,
    split_sentences, PhraseSet,
};
use crate::domain::course::{Field, NOT_AVAILABLE};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Duration sentinel when no strategy finds a length
pub const FLEXIBLE_SCHEDULE: &str = "Flexible schedule";

static RATING_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-5]\.\d{1,2})\b").unwrap());
static RATING_QUALIFIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([0-5])\s*(?:stars?|out of 5)\b").unwrap());
static RATING_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([0-5](?:\.\d+)?)\s*$").unwrap());
static ENROLLMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d[\d,]*)\s*(?:already\s+)?(?:learners|students|enrolled)\b").unwrap());
static ATTRIBUTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*offered by\s*[:\-]?\s*(.*)$").unwrap());
static PROVIDER_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.•\n]").unwrap());
static PROVIDER_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(?:has|is)\s+").unwrap());
static LEARN_MORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blearn more\b").unwrap());
static TAUGHT_IN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*taught in\s+").unwrap());
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3").unwrap());
static LIST_ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Compiled phrase lists shared by filters and normalizers
#[derive(Debug, Clone)]
pub struct CompiledPhrases {
    pub marketing: Arc<PhraseSet>,
    pub testimonial: Arc<PhraseSet>,
    pub noise: Arc<PhraseSet>,
    pub attribution: Arc<PhraseSet>,
    pub skill_exclusions: Arc<PhraseSet>,
    pub description_headings: Arc<Vec<String>>,
    pub provider_aliases: Arc<BTreeMap<String, String>>,
    pub language_aliases: Arc<BTreeMap<String, String>>,
    pub marketing_penalty: i64,
}

impl CompiledPhrases {
    pub fn compile(config: &PhraseConfig) -> ParsingResult<Self> {
        Ok(Self {
            marketing: Arc::new(PhraseSet::compile("marketing", &config.marketing)?),
            testimonial: Arc::new(PhraseSet::compile("testimonial", &config.testimonial)?),
            noise: Arc::new(PhraseSet::compile("noise", &config.noise)?),
            attribution: Arc::new(PhraseSet::compile("attribution_prefix", &config.attribution_prefix)?),
            skill_exclusions: Arc::new(PhraseSet::compile("skill_exclusions", &config.skill_exclusions)?),
            description_headings: Arc::new(
                config.description_headings.iter().map(|h| clean_text(h).to_lowercase()).collect(),
            ),
            provider_aliases: Arc::new(
                config
                    .provider_aliases
                    .iter()
                    .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                    .collect(),
            ),
            language_aliases: Arc::new(
                config
                    .language_aliases
                    .iter()
                    .map(|(k, v)| (k.trim().to_uppercase(), v.clone()))
                    .collect(),
            ),
            marketing_penalty: config.marketing_penalty,
        })
    }

    /// Drop marketing, testimonial and attribution sentences; `None` when nothing remains
    pub fn filter_description(&self, text: &str) -> Option<String> {
        let kept: Vec<String> = split_sentences(text)
            .into_iter()
            .filter(|line| {
                !self.attribution.matches(line) && !self.marketing.matches(line) && !self.testimonial.matches(line)
            })
            .collect();
        let joined = clean_text(&kept.join(" "));
        (!joined.is_empty()).then_some(joined)
    }

    /// Remaining length minus a penalty per marketing phrase still present
    pub fn score_description(&self, text: &str) -> i64 {
        let length = text.chars().count() as i64;
        length - self.marketing_penalty * self.marketing.count_matches(text) as i64
    }

    /// Strip attribution and trailing blurbs, keep the first entity-like chunk
    pub fn clean_provider(&self, raw: &str) -> Option<String> {
        let text = self.attribution.strip(&clean_text(raw));
        let text = LEARN_MORE.replace_all(&text, "");
        let first = PROVIDER_BOUNDARY.split(&text).next().unwrap_or_default().trim().to_string();
        let entity = PROVIDER_CLAUSE.split(&first).next().unwrap_or_default();
        let entity = clean_text(entity);
        (!entity.is_empty()).then_some(entity)
    }

    /// Blank lines and pure navigation/status strings
    pub fn is_noise(&self, line: &str) -> bool {
        let line = line.trim();
        line.is_empty() || self.noise.matches(line)
    }

    pub fn provider_alias(&self, name: &str) -> String {
        self.provider_aliases
            .get(&name.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn language_name(&self, term: &str) -> String {
        let term = clean_text(term);
        self.language_aliases.get(&term.to_uppercase()).cloned().unwrap_or(term)
    }
}

/// The full set of field specs, in record field order
#[derive(Debug, Clone)]
pub struct FieldSpecs {
    specs: Vec<FieldSpec>,
}

impl FieldSpecs {
    pub fn build(detail: &DetailSelectors, phrases: &PhraseConfig, default_provider: &str) -> ParsingResult<Self> {
        let phrases = CompiledPhrases::compile(phrases)?;
        let specs = vec![
            title_spec(detail)?,
            breadcrumb_spec(Field::Category, "category", &detail.category)?,
            breadcrumb_spec(Field::Subcategory, "subcategory", &detail.subcategory)?,
            rating_spec(detail)?,
            language_spec(detail, &phrases)?,
            duration_spec(detail)?,
            module_count_spec(detail)?,
            skills_spec(detail, &phrases)?,
            description_spec(detail, &phrases)?,
            level_spec(detail)?,
            registrations_spec(detail)?,
            outline_spec(detail, &phrases)?,
            provider_spec(detail, &phrases, default_provider)?,
        ];
        Ok(Self { specs })
    }

    pub fn get(&self, field: Field) -> Option<&FieldSpec> {
        self.specs.iter().find(|spec| spec.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.specs.iter()
    }
}

fn compile_one(table: &str, entry: &NamedSelector) -> ParsingResult<(String, Selector)> {
    Ok((entry.label.clone(), compile_selector(table, &entry.css)?))
}

fn non_empty(text: &str) -> Option<String> {
    let text = clean_text(text);
    (!text.is_empty()).then_some(text)
}

fn title_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    Ok(FieldSpec::new(Field::Title, NOT_AVAILABLE)
        .text_chain(&compile_selectors("title", &detail.title)?)
        .filter(non_empty)
        .normalize(fix_text_encoding))
}

fn breadcrumb_spec(field: Field, table: &str, entries: &[NamedSelector]) -> ParsingResult<FieldSpec> {
    Ok(FieldSpec::new(field, NOT_AVAILABLE)
        .text_chain(&compile_selectors(table, entries)?)
        .filter(non_empty))
}

/// Numeric rating text, never a course length or level
pub fn parse_rating(raw: &str) -> Option<f64> {
    if is_duration(raw) || is_level(raw) {
        return None;
    }
    let captured = RATING_DECIMAL
        .captures(raw)
        .or_else(|| RATING_QUALIFIED.captures(raw))
        .or_else(|| RATING_BARE.captures(raw))?;
    captured[1].parse::<f64>().ok().filter(|v| (0.0..=5.0).contains(v))
}

fn rating_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    Ok(FieldSpec::new(Field::Rating, NOT_AVAILABLE)
        .text_chain(&compile_selectors("rating", &detail.rating)?)
        .filter(|raw| parse_rating(raw).map(|v| v.to_string())))
}

fn language_spec(detail: &DetailSelectors, phrases: &CompiledPhrases) -> ParsingResult<FieldSpec> {
    let phrases = phrases.clone();
    Ok(FieldSpec::new(Field::Language, NOT_AVAILABLE)
        .text_chain(&compile_selectors("language", &detail.language)?)
        .strategy("html_lang", Probe::custom(|doc: &Document| doc.root_attr("lang")))
        .filter(|raw| non_empty(&TAUGHT_IN.replace(raw, "")))
        .normalize(move |text| phrases.language_name(text)))
}

fn duration_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    let (primary_label, primary) = compile_one("duration", &detail.duration_primary)?;
    let (secondary_label, secondary) = compile_one("duration", &detail.duration_secondary)?;
    Ok(FieldSpec::new(Field::Duration, FLEXIBLE_SCHEDULE)
        .strategy(primary_label, Probe::Text(primary))
        .strategy(secondary_label, Probe::Text(secondary))
        .strategy(
            "page_scan",
            Probe::custom(|doc: &Document| find_duration_phrase(doc.page_text())),
        )
        .filter(|raw| {
            let level_only = is_level(raw) && !has_duration_phrase(raw);
            (is_duration(raw) && !level_only).then(|| clean_text(raw))
        })
        .normalize(canonicalize_duration))
}

fn level_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    let (block_label, block) = compile_one("level", &detail.level_block)?;
    Ok(FieldSpec::new(Field::PrerequisiteLevel, NOT_AVAILABLE)
        .text_chain(&compile_selectors("level", &detail.level)?)
        .strategy(block_label, Probe::Text(block))
        .filter(find_level))
}

fn module_count_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    let (tiles_label, tiles) = compile_one("module_count", &detail.module_tiles)?;
    let (cards_label, cards) = compile_one("module_count", &detail.module_cards)?;
    Ok(FieldSpec::new(Field::ModuleCount, NOT_AVAILABLE)
        .text_chain(&compile_selectors("module_count", &detail.module_count_label)?)
        .strategy(tiles_label, Probe::Count(tiles))
        .strategy(cards_label, Probe::Count(cards))
        .filter(|raw| {
            first_number(raw)
                .filter(|n| *n >= 1.0 && n.fract() == 0.0)
                .map(|n| (n as u64).to_string())
        }))
}

fn skills_spec(detail: &DetailSelectors, phrases: &CompiledPhrases) -> ParsingResult<FieldSpec> {
    let mut spec = FieldSpec::new(Field::Skills, NOT_AVAILABLE).filter(non_empty);
    for (label, list) in compile_selectors("skills", &detail.skills_lists)? {
        let exclusions = phrases.skill_exclusions.clone();
        spec = spec.strategy(
            label,
            Probe::custom(move |doc: &Document| {
                let items: Vec<String> = doc
                    .select(&list)
                    .flat_map(|ul| ul.select(&LIST_ITEMS).map(|li| element_text(&li)).collect::<Vec<_>>())
                    .filter(|item| !item.is_empty() && !exclusions.matches(item))
                    .collect();
                (!items.is_empty()).then(|| items.join("; "))
            }),
        );
    }
    Ok(spec)
}

/// Text of a heading's section with the heading itself left out
fn section_text(block: &scraper::ElementRef<'_>, heading: &scraper::ElementRef<'_>) -> String {
    let heading_id = heading.id();
    let parts: Vec<&str> = block
        .descendants()
        .filter(|node| !node.ancestors().any(|a| a.id() == heading_id))
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect();
    clean_text(&parts.join(" "))
}

fn description_spec(detail: &DetailSelectors, phrases: &CompiledPhrases) -> ParsingResult<FieldSpec> {
    let mut spec = FieldSpec::new(Field::Description, NOT_AVAILABLE)
        .text_chain(&compile_selectors("description", &detail.description_containers)?);

    let headings = compile_selector("description_headings", &detail.description_headings)?;
    for wanted in phrases.description_headings.iter() {
        let headings = headings.clone();
        let wanted = wanted.clone();
        let section_phrases = phrases.clone();
        spec = spec.strategy(
            format!("heading_{wanted}"),
            Probe::custom(move |doc: &Document| {
                doc.select(&headings)
                    .filter(|h| element_text(h).to_lowercase() == wanted)
                    .filter_map(|h| {
                        let block = h.parent().and_then(scraper::ElementRef::wrap)?;
                        Some(section_text(&block, &h))
                    })
                    .find(|text| section_phrases.filter_description(text).is_some())
            }),
        );
    }

    spec = spec.strategy(
        "json_ld",
        Probe::custom(|doc: &Document| extract_course_metadata(doc.html()).description),
    );
    for (label, selector) in compile_selectors("meta_description", &detail.meta_description)? {
        spec = spec.strategy(label, Probe::Attr(selector, "content".to_string()));
    }

    let filter_phrases = phrases.clone();
    let score_phrases = phrases.clone();
    Ok(spec
        .filter(move |raw| filter_phrases.filter_description(raw))
        .normalize(fix_text_encoding)
        .best_score(move |text| score_phrases.score_description(text)))
}

fn registrations_spec(detail: &DetailSelectors) -> ParsingResult<FieldSpec> {
    let mut spec = FieldSpec::new(Field::Registrations, NOT_AVAILABLE)
        .text_chain(&compile_selectors("registrations", &detail.registrations)?);

    for (label, selector) in compile_selectors("registration_blocks", &detail.registration_blocks)? {
        spec = spec.strategy(
            label,
            Probe::custom(move |doc: &Document| {
                doc.select(&selector).find_map(|el| {
                    let text = element_text(&el);
                    ENROLLMENT.captures(&text).map(|caps| caps[1].to_string())
                })
            }),
        );
    }

    Ok(spec
        .strategy(
            "page_scan",
            Probe::custom(|doc: &Document| {
                ENROLLMENT.captures(doc.page_text()).map(|caps| caps[1].to_string())
            }),
        )
        .filter(|raw| {
            first_number(raw)
                .filter(|n| *n >= 0.0)
                .map(|n| (n.trunc() as u64).to_string())
        }))
}

/// Heading and list texts inside a container, paragraphs when neither exists
fn outline_lines(container: &scraper::ElementRef<'_>, phrases: &CompiledPhrases) -> Vec<String> {
    let keep = |text: &String| !phrases.is_noise(text) && !is_modules_line(text);
    let mut parts: Vec<String> = container
        .select(&HEADINGS)
        .map(|h| element_text(&h))
        .chain(container.select(&LIST_ITEMS).map(|li| element_text(&li)))
        .filter(keep)
        .collect();
    if parts.is_empty() {
        parts = container.select(&PARAGRAPHS).map(|p| element_text(&p)).filter(keep).collect();
    }
    if parts.is_empty() {
        parts = Some(element_text(container)).into_iter().filter(keep).collect();
    }
    parts
}

fn outline_spec(detail: &DetailSelectors, phrases: &CompiledPhrases) -> ParsingResult<FieldSpec> {
    let mut spec = FieldSpec::new(Field::ContentOutline, NOT_AVAILABLE);
    for (label, selector) in compile_selectors("outline_containers", &detail.outline_containers)? {
        let container_phrases = phrases.clone();
        spec = spec.strategy(
            label,
            Probe::custom(move |doc: &Document| {
                let lines = outline_lines(&doc.first(&selector)?, &container_phrases);
                (!lines.is_empty()).then(|| lines.join("\n"))
            }),
        );
    }

    let markers = compile_selectors("outline_fallbacks", &detail.outline_fallbacks)?;
    let marker_phrases = phrases.clone();
    let filter_phrases = phrases.clone();
    Ok(spec
        .strategy(
            "module_markers",
            Probe::custom(move |doc: &Document| {
                let lines: Vec<String> = markers
                    .iter()
                    .flat_map(|(_, selector)| doc.select(selector).map(|el| element_text(&el)).collect::<Vec<_>>())
                    .filter(|line| !marker_phrases.is_noise(line) && !is_modules_line(line))
                    .collect();
                (!lines.is_empty()).then(|| lines.join("\n"))
            }),
        )
        .filter(move |raw| {
            let lines: Vec<&str> = raw
                .lines()
                .map(str::trim)
                .filter(|line| !filter_phrases.is_noise(line) && !is_modules_line(line))
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        })
        .normalize(|text| {
            text.lines()
                .map(fix_text_encoding)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        }))
}

fn provider_spec(detail: &DetailSelectors, phrases: &CompiledPhrases, default_provider: &str) -> ParsingResult<FieldSpec> {
    let mut spec = FieldSpec::new(Field::Provider, default_provider);
    for (label, selector) in compile_selectors("provider", &detail.provider)? {
        spec = spec.strategy(label, Probe::DirectText(selector));
    }

    let filter_phrases = phrases.clone();
    let alias_phrases = phrases.clone();
    Ok(spec
        .strategy(
            "offered_by_text",
            Probe::custom(|doc: &Document| {
                let lines = doc.lines();
                lines.iter().enumerate().find_map(|(i, line)| {
                    let caps = ATTRIBUTION_LINE.captures(line)?;
                    let rest = caps[1].trim();
                    if rest.is_empty() {
                        lines.get(i + 1).cloned()
                    } else {
                        Some(rest.to_string())
                    }
                })
            }),
        )
        .filter(move |raw| filter_phrases.clean_provider(raw))
        .normalize(move |text| alias_phrases.provider_alias(&clean_text(text))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::field_resolution::resolve;

    fn specs() -> FieldSpecs {
        FieldSpecs::build(&DetailSelectors::default(), &PhraseConfig::default(), "Coursera").unwrap()
    }

    fn resolve_on(field: Field, body: &str) -> String {
        let specs = specs();
        let document = Document::parse(body);
        resolve(specs.get(field).unwrap(), &document).value
    }

    #[test]
    fn test_every_field_has_a_spec() {
        let specs = specs();
        for field in Field::ALL {
            assert!(specs.get(field).is_some(), "missing spec for {field}");
        }
    }

    #[test]
    fn test_parse_rating_disambiguates_durations() {
        assert_eq!(parse_rating("4 weeks"), None);
        assert_eq!(parse_rating("4.8 out of 5"), Some(4.8));
        assert_eq!(parse_rating("4.7 stars (2,345 reviews)"), Some(4.7));
        assert_eq!(parse_rating("4 stars"), Some(4.0));
        assert_eq!(parse_rating("12 hours"), None);
        assert_eq!(parse_rating("Beginner level"), None);
        assert_eq!(parse_rating("2,345 reviews"), None);
    }

    #[test]
    fn test_provider_cleaning() {
        let phrases = CompiledPhrases::compile(&PhraseConfig::default()).unwrap();
        assert_eq!(phrases.clean_provider("Offered by Google Cloud").as_deref(), Some("Google Cloud"));
        assert_eq!(
            phrases.clean_provider("Duke University has about 13,000 undergraduates. Learn more").as_deref(),
            Some("Duke University")
        );
        assert_eq!(phrases.clean_provider("Offered by").as_deref(), None);
        assert_eq!(phrases.provider_alias("CalArts"), "California Institute of the Arts");
        assert_eq!(phrases.language_name("zh"), "Chinese");
        assert_eq!(phrases.language_name("Portuguese"), "Portuguese");
    }

    #[test]
    fn test_provider_from_attribution_line() {
        let body = "<html><body><div><span>Offered by</span><span>CalArts</span></div></body></html>";
        assert_eq!(resolve_on(Field::Provider, body), "California Institute of the Arts");
        assert_eq!(resolve_on(Field::Provider, "<html><body></body></html>"), "Coursera");
    }

    #[test]
    fn test_description_drops_marketing_only_candidates() {
        let phrases = CompiledPhrases::compile(&PhraseConfig::default()).unwrap();
        let text = "Offered by Google. Earn a shareable career certificate. Gain a foundational understanding of data.";
        assert_eq!(phrases.filter_description(text), None);
        assert_eq!(
            phrases.filter_description("Offered by Google. Learn SQL from scratch.").as_deref(),
            Some("Learn SQL from scratch.")
        );
    }

    #[test]
    fn test_description_prefers_heading_section_over_meta() {
        let body = r#"<html><head><meta name="description" content="Short blurb."></head><body>
            <section><h2>About this Course</h2><p>This course teaches statistics from first principles with many worked examples.</p></section>
            </body></html>"#;
        let value = resolve_on(Field::Description, body);
        assert!(value.starts_with("This course teaches statistics"), "got {value:?}");
    }

    #[test]
    fn test_every_matching_heading_is_a_candidate() {
        let body = r#"<html><body>
            <section><h2>Overview</h2><p>Short intro to the topic.</p></section>
            <section><h3>What you'll learn</h3><p>Linear models, decision trees, ensembles and how to validate each of them on held-out data.</p></section>
            </body></html>"#;
        let specs = specs();
        let document = Document::parse(body);
        let resolution = resolve(specs.get(Field::Description).unwrap(), &document);

        let accepted: Vec<&str> = resolution
            .candidates
            .iter()
            .filter(|c| c.accepted.is_some())
            .map(|c| c.label.as_str())
            .collect();
        assert!(accepted.contains(&"heading_overview"));
        assert!(accepted.contains(&"heading_what you'll learn"));
        assert_eq!(resolution.winner.as_deref(), Some("heading_what you'll learn"));
        assert!(resolution.value.starts_with("Linear models"));
    }

    #[test]
    fn test_language_from_html_lang_and_prefix() {
        assert_eq!(resolve_on(Field::Language, r#"<html lang="es"><body></body></html>"#), "Spanish");
        assert_eq!(resolve_on(Field::Language, "<html><body></body></html>"), "N/A");
    }

    #[test]
    fn test_duration_page_scan_and_sentinel() {
        assert_eq!(
            resolve_on(Field::Duration, "<html><body><p>Approx. 1 hrs to complete</p></body></html>"),
            "1 hour"
        );
        assert_eq!(resolve_on(Field::Duration, "<html><body><p>Self paced</p></body></html>"), FLEXIBLE_SCHEDULE);
    }

    #[test]
    fn test_module_count_from_cards() {
        let body = r#"<html><body>
            <div data-testid="module"><h3>Intro</h3></div>
            <div data-testid="module"><h3>Basics</h3></div>
            <div data-testid="module"><h3>Advanced</h3></div>
            </body></html>"#;
        assert_eq!(resolve_on(Field::ModuleCount, body), "3");
        assert_eq!(resolve_on(Field::ContentOutline, body), "Intro\nBasics\nAdvanced");
    }

    #[test]
    fn test_registrations_from_learner_phrase() {
        let body = "<html><body><p><strong>1,234,567</strong> already enrolled</p></body></html>";
        assert_eq!(resolve_on(Field::Registrations, body), "1234567");
    }

    #[test]
    fn test_level_from_testid() {
        let body = r#"<html><body><div data-testid="level">Intermediate level</div></body></html>"#;
        assert_eq!(resolve_on(Field::PrerequisiteLevel, body), "Intermediate");
    }

    #[test]
    fn test_outline_skips_noise_and_module_count_lines() {
        let phrases = CompiledPhrases::compile(&PhraseConfig::default()).unwrap();
        assert!(phrases.is_noise("Preview"));
        assert!(phrases.is_noise("  "));
        assert!(!phrases.is_noise("Introduction to Python"));

        let body = r#"<html><body><div data-testid="syllabus"><ul>
            <li>Getting started</li><li>Preview</li><li>3 modules</li><li>Loops and functions</li>
            </ul></div></body></html>"#;
        assert_eq!(resolve_on(Field::ContentOutline, body), "Getting started\nLoops and functions");
    }
}

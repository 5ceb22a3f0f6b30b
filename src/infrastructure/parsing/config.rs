//! Parsing configuration for HTML extraction
//!
//! Centralized locator tables and phrase lists. Everything here is plain data,
//! compiled once when the link collector, pagination controller or field
//! specs are constructed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the detail page content area on the current course page layout
const MAIN: &str = "body > div:nth-of-type(2) > div > main";

/// Root of the results area on category listing pages
const LISTING: &str = "body > div:nth-of-type(2) > div > div > div > div:nth-of-type(3) > div:nth-of-type(1) > div";

/// A structural query against a rendered page: a CSS selector, optionally
/// narrowed to elements whose text contains (or equals) a phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub css: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub exact: bool,
}

impl Locator {
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
            exact: false,
        }
    }

    pub fn with_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
            exact: false,
        }
    }

    pub fn with_exact_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
            exact: true,
        }
    }

    /// Whether an element's normalized text satisfies the text constraint
    pub fn text_matches(&self, element_text: &str) -> bool {
        match &self.text {
            None => true,
            Some(wanted) if self.exact => element_text.trim().eq_ignore_ascii_case(wanted.trim()),
            Some(wanted) => element_text.to_lowercase().contains(&wanted.to_lowercase()),
        }
    }
}

/// A CSS selector with the label it reports under in provenance output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSelector {
    pub label: String,
    pub css: String,
}

fn named(label: &str, css: &str) -> NamedSelector {
    NamedSelector {
        label: label.to_string(),
        css: css.to_string(),
    }
}

fn main_path(rest: &str) -> String {
    format!("{MAIN} > {rest}")
}

/// Complete selector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub pagination: PaginationSelectors,
    pub discovery: DiscoverySelectors,
    pub detail: DetailSelectors,
}

/// Selectors for detail-page links on category listing pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Exact structural locator for course card links
    pub primary_link: String,
    /// Layout-agnostic locator: any link into a detail page
    pub fallback_link: String,
    /// Minimal "content present" signal awaited after navigation
    pub content_present: Locator,
    /// Element captured before advancing, awaited to go stale
    pub reference_element: Locator,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            primary_link: format!(
                "{LISTING} > div:nth-of-type(10) > div > section > div > div > div > div:nth-of-type(3) > div > div > div:nth-of-type(2) > div:nth-of-type(1) > div > ul > li > div > div > div > div > div > div:nth-of-type(2) > div:nth-of-type(1) > div:nth-of-type(2) > a[href]"
            ),
            fallback_link: "a[href*='/learn/']".to_string(),
            content_present: Locator::css("a"),
            reference_element: Locator::css("a[href*='/learn/']"),
        }
    }
}

/// Locators for the "next page" control and consent banners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSelectors {
    /// Ordered: exact locator first, then layout-agnostic fallbacks
    pub next: Vec<Locator>,
    pub cookie_accept: Vec<Locator>,
}

impl Default for PaginationSelectors {
    fn default() -> Self {
        Self {
            next: vec![
                Locator::css(&format!(
                    "{LISTING} > div:nth-of-type(10) > div > section > div > div > div > div:nth-of-type(3) > div > div > div:nth-of-type(3) > div:nth-of-type(2) > div > nav > ul > li:nth-of-type(9) > button"
                )),
                Locator::css("[aria-label='Next Page']"),
                Locator::css("nav[class*='pagination'] button[aria-label='Next']"),
                Locator::css("nav[class*='pagination'] li[class*='next'] button"),
                Locator::with_text("button", "Next"),
                Locator::with_text("button[class*='pagination']", "Next"),
            ],
            cookie_accept: vec![
                Locator::css("#onetrust-accept-btn-handler"),
                Locator::with_exact_text("button", "Accept"),
                Locator::with_text("button", "Accept all"),
                Locator::css("[class*='ot-sdk-container'] button[id*='accept']"),
            ],
        }
    }
}

/// Locators for discovering categories on the browse page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySelectors {
    pub explore_container: String,
    pub show_more: Vec<Locator>,
    /// Category anchors inside the explore container
    pub category_anchor: String,
    /// Whole-page fallback when the container is missing
    pub page_category_anchor: String,
}

impl Default for DiscoverySelectors {
    fn default() -> Self {
        Self {
            explore_container: format!("{LISTING} > div:nth-of-type(1)"),
            show_more: vec![
                Locator::with_exact_text("button", "Show more"),
                Locator::with_text("button", "Show more"),
                Locator::css("button[aria-label*='Show'][aria-label*='more']"),
            ],
            category_anchor: "a[href*='/browse/']".to_string(),
            page_category_anchor: "a[href^='/browse/']".to_string(),
        }
    }
}

/// Detail page locators, one ordered chain per field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    pub title: Vec<NamedSelector>,
    pub category: Vec<NamedSelector>,
    pub subcategory: Vec<NamedSelector>,
    pub rating: Vec<NamedSelector>,
    pub language: Vec<NamedSelector>,
    pub duration_primary: NamedSelector,
    pub duration_secondary: NamedSelector,
    /// Primary level locator followed by its fallbacks
    pub level: Vec<NamedSelector>,
    /// Block scanned for a level word when no locator hits
    pub level_block: NamedSelector,
    pub module_count_label: Vec<NamedSelector>,
    pub module_tiles: NamedSelector,
    pub module_cards: NamedSelector,
    pub skills_lists: Vec<NamedSelector>,
    pub description_containers: Vec<NamedSelector>,
    /// Heading elements checked against the description heading allow-list
    pub description_headings: String,
    pub meta_description: Vec<NamedSelector>,
    pub registrations: Vec<NamedSelector>,
    /// Elements scanned for "<number> learners/students/enrolled"
    pub registration_blocks: Vec<NamedSelector>,
    pub outline_containers: Vec<NamedSelector>,
    /// Generic module/syllabus markers used when no container yields text
    pub outline_fallbacks: Vec<NamedSelector>,
    pub provider: Vec<NamedSelector>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        let hero = "section:nth-of-type(2) > div > div > div:nth-of-type(2) > div > div:nth-of-type(2)";
        let about = "section:nth-of-type(2) > div > div > div:nth-of-type(4) > div > div";
        Self {
            title: vec![named("title_h1", "h1"), named("title_h2", "h2"), named("title_tag", "title")],
            category: vec![
                named("category_breadcrumb", &main_path("section:nth-of-type(1) > div > div > div > div:nth-of-type(1) > nav > ol > li:nth-of-type(3) > a")),
                named("category_breadcrumb_any", "nav ol > li:nth-of-type(3) > a"),
            ],
            subcategory: vec![
                named("subcategory_breadcrumb", &main_path("section:nth-of-type(1) > div > div > div > div:nth-of-type(1) > nav > ol > li:nth-of-type(4) > a")),
                named("subcategory_breadcrumb_any", "nav ol > li:nth-of-type(4) > a"),
            ],
            rating: vec![
                named("rating_primary", &main_path(&format!("{hero} > div:nth-of-type(2) > div > div > div:nth-of-type(1)"))),
                named("rating_fallback", &main_path(&format!("{hero} > div:nth-of-type(2) > div > div > div:nth-of-type(1) > font > font"))),
                named("rating_testid", "[data-testid='ratings-count-without-asterisks'], [data-testid='rating']"),
            ],
            language: vec![
                named("language_primary", &main_path(&format!("{about} > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(3) > div > span"))),
            ],
            duration_primary: named("time_primary", &main_path(&format!("{hero} > div:nth-of-type(3) > div > div > div:nth-of-type(1)"))),
            duration_secondary: named("time_flexible", &main_path(&format!("{hero} > div:nth-of-type(4) > div > div > div:nth-of-type(1)"))),
            level: vec![
                named("level_primary", &main_path(&format!("{hero} > div:nth-of-type(3) > div > div > div:nth-of-type(1)"))),
                named("level_testid", "[data-testid='level']"),
                named("level_test", "[data-test='level']"),
            ],
            level_block: named("level_block", &main_path(hero)),
            module_count_label: vec![
                named("num_modules_span_primary", &main_path("div:nth-of-type(5) > div > div > div > div:nth-of-type(1) > h2 > span")),
                named("num_modules_span_fallback", &main_path("div:nth-of-type(4) > div > div > div > div:nth-of-type(1) > h2 > span")),
            ],
            module_tiles: named("num_modules_anchor_count", &main_path(&format!("{hero} > div:nth-of-type(1) > div > div > div:nth-of-type(1) > div > a"))),
            module_cards: named("module_card_headings", "[data-testid='module'] h3"),
            skills_lists: vec![
                named("skills_ul_primary", &main_path(&format!("{about} > div:nth-of-type(2) > ul"))),
                named("skills_ul_fallback", &main_path(&format!("{about} > div:nth-of-type(1) > ul"))),
            ],
            description_containers: vec![
                named("container_div4", &main_path("div:nth-of-type(4) > div > div > div > div:nth-of-type(1) > div > div")),
                named("container_div5", &main_path("div:nth-of-type(5) > div > div > div > div:nth-of-type(1) > div > div")),
                named("css_data_testid", "[data-testid='description'], [data-test='description']"),
            ],
            description_headings: "h2, h3".to_string(),
            meta_description: vec![
                named("og:description", "meta[property='og:description']"),
                named("meta:description", "meta[name='description']"),
            ],
            registrations: vec![
                named("num_registered_primary", &main_path("section:nth-of-type(2) > div > div > div:nth-of-type(1) > div:nth-of-type(1) > div > div > div > div:nth-of-type(2) > div:nth-of-type(4) > p > span > strong > span")),
                named("num_registered_instructor", &main_path("div:nth-of-type(4) > div > div > div > div:nth-of-type(3) > div > div:nth-of-type(1) > div:nth-of-type(2) > div > div:nth-of-type(2) > div:nth-of-type(3) > span:nth-of-type(3) > span")),
            ],
            registration_blocks: vec![
                named("learners_section", "section"),
                named("learners_div", "div"),
                named("learners_span", "span"),
            ],
            outline_containers: vec![
                named("content_div4", &main_path("div:nth-of-type(4) > div > div > div > div:nth-of-type(2) > div > div")),
                named("content_div5", &main_path("div:nth-of-type(5) > div > div > div > div:nth-of-type(2) > div > div")),
            ],
            outline_fallbacks: vec![
                named("module_tiles", &main_path(&format!("{hero} > div:nth-of-type(1) > div > div > div:nth-of-type(1) > div > a"))),
                named("module_headings", "[data-testid='module'] h3"),
                named("syllabus_items", "[data-testid='syllabus'] li"),
            ],
            provider: vec![
                named("offered_by_primary", &main_path("div:nth-of-type(5) > div > div > div > div:nth-of-type(3) > div > div:nth-of-type(2) > div:nth-of-type(2) > div > div:nth-of-type(2) > a > span")),
                named("offered_by_alt", &main_path("div:nth-of-type(4) > div > div > div > div:nth-of-type(3) > div > div:nth-of-type(2) > div:nth-of-type(2) > div > div:nth-of-type(2) > a > span")),
            ],
        }
    }
}

/// Phrase lists and vocabularies used by filters and normalizers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Marketing boilerplate (regex, case-insensitive)
    pub marketing: Vec<String>,
    pub testimonial: Vec<String>,
    /// Navigation and status lines that never carry outline content
    pub noise: Vec<String>,
    /// Lines starting with an institutional attribution
    pub attribution_prefix: Vec<String>,
    /// Headings whose section holds the canonical description
    pub description_headings: Vec<String>,
    /// Score penalty per marketing phrase still present in a description
    pub marketing_penalty: i64,
    /// List items that are controls rather than skills
    pub skill_exclusions: Vec<String>,
    /// Short provider names mapped to full institution names
    pub provider_aliases: BTreeMap<String, String>,
    /// Language codes/names (upper-case keys) mapped to display names
    pub language_aliases: BTreeMap<String, String>,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        let to_strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            marketing: to_strings(&[
                r"Build your subject-matter expertise",
                r"This course is part of the .* Specialization",
                r"When you enroll in this course, you'll also be enrolled",
                r"Learn new concepts from industry experts",
                r"Gain a foundational understanding",
                r"Develop job-relevant skills",
                r"Earn a shareable career certificate",
            ]),
            testimonial: to_strings(&[r"\bLearner since\b", r"Coursera allows me to learn without limits"]),
            noise: to_strings(&[r"^explore more$", r"^status: preview$", r"^preview$", r"^learn more$"]),
            attribution_prefix: to_strings(&[r"^\s*Offered by\b"]),
            description_headings: to_strings(&[
                "About this Course",
                "About the Course",
                "Course description",
                "What you'll learn",
                "Overview",
            ]),
            marketing_penalty: 100,
            skill_exclusions: to_strings(&[r"^view all skills$"]),
            provider_aliases: to_map(&[
                ("CalArts", "California Institute of the Arts"),
                ("MoMA", "The Museum of Modern Art"),
            ]),
            language_aliases: to_map(&[
                ("EN", "English"),
                ("ENG", "English"),
                ("ENGLISH", "English"),
                ("BM", "Malay"),
                ("MS", "Malay"),
                ("MALAY", "Malay"),
                ("ZH", "Chinese"),
                ("CN", "Chinese"),
                ("CHINESE", "Chinese"),
                ("ES", "Spanish"),
                ("ESP", "Spanish"),
                ("SPANISH", "Spanish"),
                ("FR", "French"),
                ("FRENCH", "French"),
                ("DE", "German"),
                ("GERMAN", "German"),
            ]),
        }
    }
}

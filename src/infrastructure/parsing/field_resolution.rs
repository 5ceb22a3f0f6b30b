//! Field resolution engine
//!
//! Every record field is described by a [`FieldSpec`]: an ordered list of
//! labelled strategies, a filter that turns raw strategy output into an
//! accepted candidate (or rejects it), a normalizer applied to the chosen
//! candidate, a selection rule and the sentinel returned when nothing is
//! accepted. [`resolve`] is the single routine that consumes a spec.
//!
//! All strategies always run so that provenance lists every candidate.

use super::config::NamedSelector;
use super::error::{ParsingError, ParsingResult};
use super::text::clean_text;
use crate::domain::course::Field;
use once_cell::unsync::OnceCell;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw strategy output into accepted candidate text, or rejects it
pub type Filter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
/// Maps the chosen candidate to its record value
pub type Normalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Scores accepted candidate text; higher wins
pub type Scorer = Arc<dyn Fn(&str) -> i64 + Send + Sync>;
/// Strategy implemented as arbitrary document logic
pub type CustomProbe = Arc<dyn Fn(&Document) -> Option<String> + Send + Sync>;

/// A parsed detail page with lazily computed whole-page views
pub struct Document {
    html: Html,
    page_text: OnceCell<String>,
    lines: OnceCell<Vec<String>>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            page_text: OnceCell::new(),
            lines: OnceCell::new(),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    pub fn first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// Whitespace-collapsed text of the whole body
    pub fn page_text(&self) -> &str {
        self.page_text.get_or_init(|| {
            let root = self.body().unwrap_or_else(|| self.html.root_element());
            element_text(&root)
        })
    }

    /// Non-empty trimmed text nodes of the body, in document order
    pub fn lines(&self) -> &[String] {
        self.lines.get_or_init(|| {
            let root = self.body().unwrap_or_else(|| self.html.root_element());
            root.descendants()
                .filter_map(|node| match node.value() {
                    Node::Text(text) => Some(clean_text(text)),
                    _ => None,
                })
                .filter(|line| !line.is_empty())
                .collect()
        })
    }

    /// Value of an attribute on the `<html>` element
    pub fn root_attr(&self, name: &str) -> Option<String> {
        self.html
            .root_element()
            .value()
            .attr(name)
            .map(clean_text)
            .filter(|v| !v.is_empty())
    }

    fn body(&self) -> Option<ElementRef<'_>> {
        static BODY: once_cell::sync::Lazy<Selector> =
            once_cell::sync::Lazy::new(|| Selector::parse("body").unwrap());
        self.html.select(&BODY).next()
    }
}

/// Whitespace-collapsed text content of an element, text nodes space-joined
pub fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the element's own text nodes, ignoring descendants
pub fn direct_text(element: &ElementRef<'_>) -> String {
    let parts: Vec<&str> = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| &**t))
        .collect();
    clean_text(&parts.join(" "))
}

/// How a strategy reads a document
#[derive(Clone)]
pub enum Probe {
    /// Text content of the first match
    Text(Selector),
    /// Own text nodes of the first match
    DirectText(Selector),
    /// An attribute of the first match
    Attr(Selector, String),
    /// Number of matches, absent when zero
    Count(Selector),
    Custom(CustomProbe),
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Text(_) => f.write_str("Text"),
            Probe::DirectText(_) => f.write_str("DirectText"),
            Probe::Attr(_, attr) => write!(f, "Attr({attr})"),
            Probe::Count(_) => f.write_str("Count"),
            Probe::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Probe {
    pub fn custom(f: impl Fn(&Document) -> Option<String> + Send + Sync + 'static) -> Self {
        Probe::Custom(Arc::new(f))
    }

    /// Run against a document, returning raw text and the number of matched elements
    fn run(&self, document: &Document) -> (Option<String>, usize) {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        match self {
            Probe::Text(selector) => {
                let hits = document.select(selector).count();
                let raw = document.first(selector).map(|el| element_text(&el)).and_then(non_empty);
                (raw, hits)
            }
            Probe::DirectText(selector) => {
                let hits = document.select(selector).count();
                let raw = document.first(selector).map(|el| direct_text(&el)).and_then(non_empty);
                (raw, hits)
            }
            Probe::Attr(selector, attr) => {
                let hits = document.select(selector).count();
                let raw = document
                    .first(selector)
                    .and_then(|el| el.value().attr(attr).map(clean_text))
                    .and_then(non_empty);
                (raw, hits)
            }
            Probe::Count(selector) => {
                let hits = document.select(selector).count();
                let raw = (hits > 0).then(|| hits.to_string());
                (raw, hits)
            }
            Probe::Custom(f) => {
                let raw = f(document).and_then(non_empty);
                let hits = usize::from(raw.is_some());
                (raw, hits)
            }
        }
    }
}

/// One labelled way of producing a candidate
#[derive(Debug, Clone)]
pub struct Strategy {
    pub label: String,
    pub probe: Probe,
}

impl Strategy {
    pub fn new(label: impl Into<String>, probe: Probe) -> Self {
        Self {
            label: label.into(),
            probe,
        }
    }
}

/// How a winner is picked among accepted candidates
#[derive(Clone)]
pub enum Selection {
    /// Earliest accepted candidate in strategy order
    FirstValid,
    /// Strictly greatest score, ties to the earliest strategy
    BestScore(Scorer),
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::FirstValid => f.write_str("FirstValid"),
            Selection::BestScore(_) => f.write_str("BestScore"),
        }
    }
}

/// Declarative description of how to resolve one field
#[derive(Clone)]
pub struct FieldSpec {
    pub field: Field,
    pub strategies: Vec<Strategy>,
    pub filter: Filter,
    pub normalizer: Normalizer,
    pub selection: Selection,
    pub sentinel: String,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("field", &self.field)
            .field("strategies", &self.strategies)
            .field("selection", &self.selection)
            .field("sentinel", &self.sentinel)
            .finish_non_exhaustive()
    }
}

impl FieldSpec {
    /// A spec that accepts any non-empty text unchanged
    pub fn new(field: Field, sentinel: impl Into<String>) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            filter: Arc::new(|raw: &str| Some(raw.to_string())),
            normalizer: Arc::new(|text: &str| clean_text(text)),
            selection: Selection::FirstValid,
            sentinel: sentinel.into(),
        }
    }

    pub fn strategy(mut self, label: impl Into<String>, probe: Probe) -> Self {
        self.strategies.push(Strategy::new(label, probe));
        self
    }

    /// Append one text strategy per named selector
    pub fn text_chain(mut self, selectors: &[(String, Selector)]) -> Self {
        for (label, selector) in selectors {
            self.strategies.push(Strategy::new(label.clone(), Probe::Text(selector.clone())));
        }
        self
    }

    pub fn filter(mut self, f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.filter = Arc::new(f);
        self
    }

    pub fn normalize(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.normalizer = Arc::new(f);
        self
    }

    pub fn best_score(mut self, scorer: impl Fn(&str) -> i64 + Send + Sync + 'static) -> Self {
        self.selection = Selection::BestScore(Arc::new(scorer));
        self
    }
}

/// One strategy's output for one field of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub label: String,
    /// Raw text as located, before filtering
    pub raw: Option<String>,
    /// Filtered text, present only when the candidate passed validation
    pub accepted: Option<String>,
    pub score: Option<i64>,
    /// Elements matched by the strategy's locator
    pub hits: usize,
}

/// Outcome of resolving one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldResolution {
    pub field: Field,
    pub value: String,
    /// Label of the winning strategy; `None` when the sentinel was used
    pub winner: Option<String>,
    pub candidates: Vec<Candidate>,
}

impl FieldResolution {
    pub fn is_sentinel(&self) -> bool {
        self.winner.is_none()
    }

    pub fn winning_candidate(&self) -> Option<&Candidate> {
        let label = self.winner.as_deref()?;
        self.candidates.iter().find(|c| c.label == label)
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            field: self.field,
            label: self.winner.clone(),
            snippet: self
                .winning_candidate()
                .and_then(|c| c.raw.clone())
                .unwrap_or_default(),
            hits: self
                .candidates
                .iter()
                .map(|c| StrategyHits {
                    label: c.label.clone(),
                    hits: c.hits,
                    accepted: c.accepted.is_some(),
                })
                .collect(),
        }
    }
}

/// Which strategy produced a field's value and what it saw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub field: Field,
    pub label: Option<String>,
    pub snippet: String,
    pub hits: Vec<StrategyHits>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyHits {
    pub label: String,
    pub hits: usize,
    pub accepted: bool,
}

/// Resolve a field: run every strategy, filter, select, normalize, default.
pub fn resolve(spec: &FieldSpec, document: &Document) -> FieldResolution {
    let mut candidates = Vec::with_capacity(spec.strategies.len());
    let mut normalized = Vec::with_capacity(spec.strategies.len());

    for strategy in &spec.strategies {
        let (raw, hits) = strategy.probe.run(document);
        let accepted = raw.as_deref().and_then(|r| (spec.filter)(r)).filter(|a| !a.trim().is_empty());
        let value = accepted
            .as_deref()
            .map(|a| (spec.normalizer)(a))
            .filter(|v| !v.trim().is_empty());
        // A candidate whose normalized form is empty carries nothing
        let accepted = accepted.filter(|_| value.is_some());
        let score = match (&spec.selection, accepted.as_deref()) {
            (Selection::BestScore(scorer), Some(text)) => Some(scorer(text)),
            _ => None,
        };

        debug!(
            field = %spec.field,
            strategy = %strategy.label,
            hits,
            accepted = accepted.is_some(),
            "strategy evaluated"
        );

        candidates.push(Candidate {
            label: strategy.label.clone(),
            raw,
            accepted,
            score,
            hits,
        });
        normalized.push(value);
    }

    let winner_index = match &spec.selection {
        Selection::FirstValid => normalized.iter().position(Option::is_some),
        Selection::BestScore(_) => {
            let mut best: Option<(usize, i64)> = None;
            for (index, candidate) in candidates.iter().enumerate() {
                let Some(score) = candidate.score else { continue };
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((index, score));
                }
            }
            best.map(|(index, _)| index)
        }
    };

    match winner_index.and_then(|i| normalized[i].clone().map(|v| (i, v))) {
        Some((index, value)) => FieldResolution {
            field: spec.field,
            value,
            winner: Some(candidates[index].label.clone()),
            candidates,
        },
        None => FieldResolution {
            field: spec.field,
            value: spec.sentinel.clone(),
            winner: None,
            candidates,
        },
    }
}

/// Compile one selector from a configuration table
pub fn compile_selector(table: &str, css: &str) -> ParsingResult<Selector> {
    Selector::parse(css).map_err(|e| {
        ParsingError::invalid_selector(table, &format!("'{css}': {e}"), vec![css.to_string()])
    })
}

/// Compile a named selector table, skipping entries that fail to parse.
///
/// Errors only when the table is non-empty and nothing compiled.
pub fn compile_selectors(table: &str, entries: &[NamedSelector]) -> ParsingResult<Vec<(String, Selector)>> {
    let mut selectors = Vec::new();
    let mut rejected = Vec::new();

    for entry in entries {
        match Selector::parse(&entry.css) {
            Ok(selector) => selectors.push((entry.label.clone(), selector)),
            Err(e) => {
                warn!("Failed to compile selector '{}' in {}: {}", entry.css, table, e);
                rejected.push(entry.css.clone());
            }
        }
    }

    if selectors.is_empty() && !entries.is_empty() {
        return Err(ParsingError::invalid_selector(
            table,
            &format!("no valid selectors compiled from {} entries", entries.len()),
            rejected,
        ));
    }

    Ok(selectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    fn doc() -> Document {
        Document::parse(
            r#"<html lang="en"><body>
                <h1> Primary   Title </h1>
                <h2>Secondary</h2>
                <p class="short">abc</p>
                <p class="long">abcdef</p>
                <p class="same">xyz</p>
                <ul><li>one</li><li>two</li></ul>
                <span class="mixed">own <b>child</b> text</span>
            </body></html>"#,
        )
    }

    #[test]
    fn test_first_valid_prefers_primary() {
        let spec = FieldSpec::new(Field::Title, "N/A")
            .strategy("h1", Probe::Text(sel("h1")))
            .strategy("h2", Probe::Text(sel("h2")));
        let resolution = resolve(&spec, &doc());
        assert_eq!(resolution.value, "Primary Title");
        assert_eq!(resolution.winner.as_deref(), Some("h1"));
        assert_eq!(resolution.candidates.len(), 2);
        assert!(resolution.candidates[1].accepted.is_some());
    }

    #[test]
    fn test_rejected_primary_falls_back() {
        let spec = FieldSpec::new(Field::Title, "N/A")
            .strategy("h1", Probe::Text(sel("h1")))
            .strategy("h2", Probe::Text(sel("h2")))
            .filter(|raw| (!raw.contains("Primary")).then(|| raw.to_string()));
        let resolution = resolve(&spec, &doc());
        assert_eq!(resolution.value, "Secondary");
        assert_eq!(resolution.candidates[0].raw.as_deref(), Some("Primary Title"));
        assert!(resolution.candidates[0].accepted.is_none());
    }

    #[test]
    fn test_sentinel_when_nothing_matches() {
        let spec = FieldSpec::new(Field::Language, "N/A").strategy("missing", Probe::Text(sel("article")));
        let resolution = resolve(&spec, &doc());
        assert_eq!(resolution.value, "N/A");
        assert!(resolution.is_sentinel());
        assert_eq!(resolution.candidates[0].hits, 0);
        assert_eq!(resolution.provenance().snippet, "");
    }

    #[test]
    fn test_best_score_and_tie_break() {
        let spec = FieldSpec::new(Field::Description, "N/A")
            .strategy("short", Probe::Text(sel("p.short")))
            .strategy("same", Probe::Text(sel("p.same")))
            .strategy("long", Probe::Text(sel("p.long")))
            .best_score(|text| text.len() as i64);
        assert_eq!(resolve(&spec, &doc()).winner.as_deref(), Some("long"));

        let tie = FieldSpec::new(Field::Description, "N/A")
            .strategy("short", Probe::Text(sel("p.short")))
            .strategy("same", Probe::Text(sel("p.same")))
            .best_score(|text| text.len() as i64);
        for _ in 0..5 {
            assert_eq!(resolve(&tie, &doc()).winner.as_deref(), Some("short"));
        }
    }

    #[test]
    fn test_probe_kinds() {
        let document = doc();
        assert_eq!(Probe::Count(sel("li")).run(&document), (Some("2".to_string()), 2));
        assert_eq!(Probe::Count(sel("table")).run(&document), (None, 0));
        assert_eq!(
            Probe::DirectText(sel("span.mixed")).run(&document).0.as_deref(),
            Some("own text")
        );
        assert_eq!(document.root_attr("lang").as_deref(), Some("en"));
        assert!(document.lines().contains(&"child".to_string()));
    }

    #[test]
    fn test_empty_normalization_is_not_a_winner() {
        let spec = FieldSpec::new(Field::Provider, "Fallback")
            .strategy("h1", Probe::Text(sel("h1")))
            .normalize(|_| String::new());
        let resolution = resolve(&spec, &doc());
        assert_eq!(resolution.value, "Fallback");
        assert!(resolution.candidates[0].accepted.is_none());
    }

    #[test]
    fn test_compile_selectors_skips_invalid() {
        let entries = vec![
            NamedSelector { label: "ok".into(), css: "h1".into() },
            NamedSelector { label: "bad".into(), css: "h1[".into() },
        ];
        let compiled = compile_selectors("title", &entries).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0, "ok");

        let all_bad = vec![NamedSelector { label: "bad".into(), css: ":::".into() }];
        assert!(compile_selectors("title", &all_bad).is_err());
    }
}

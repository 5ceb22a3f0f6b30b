//! Link and category collection from listing pages
//!
//! Pure functions of a rendered document: nothing here consults the link
//! store or the page session.

use super::config::{DiscoverySelectors, ListingSelectors};
use super::error::{ParsingError, ParsingResult};
use super::field_resolution::{compile_selector, element_text};
use crate::domain::course::{Category, LinkEntry};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use url::Url;

/// Parse a site origin, reporting it as a URL resolution failure
pub fn parse_origin(origin: &str) -> ParsingResult<Url> {
    Url::parse(origin).map_err(|e| ParsingError::UrlResolutionFailed {
        url: origin.to_string(),
        reason: format!("Invalid origin: {e}"),
        base_url: None,
    })
}

/// Collects detail-page links from one listing page
#[derive(Debug, Clone)]
pub struct LinkCollector {
    primary: Selector,
    fallback: Selector,
    origin: Url,
    strip_params: Vec<String>,
}

impl LinkCollector {
    pub fn new(selectors: &ListingSelectors, origin: &str, strip_params: &[String]) -> ParsingResult<Self> {
        Ok(Self {
            primary: compile_selector("listing.primary_link", &selectors.primary_link)?,
            fallback: compile_selector("listing.fallback_link", &selectors.fallback_link)?,
            origin: parse_origin(origin)?,
            strip_params: strip_params.to_vec(),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Primary locator first; the fallback runs only when the primary finds nothing
    pub fn collect(&self, document: &Html) -> BTreeSet<LinkEntry> {
        let links = self.collect_with(document, &self.primary);
        if !links.is_empty() {
            return links;
        }
        let links = self.collect_with(document, &self.fallback);
        debug!("Primary link locator empty, fallback found {} links", links.len());
        links
    }

    pub fn collect_from_source(&self, html: &str) -> BTreeSet<LinkEntry> {
        self.collect(&Html::parse_document(html))
    }

    pub fn normalize(&self, href: &str) -> Option<LinkEntry> {
        LinkEntry::normalize(href, &self.origin, &self.strip_params)
    }

    fn collect_with(&self, document: &Html, selector: &Selector) -> BTreeSet<LinkEntry> {
        document
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.normalize(href))
            .collect()
    }
}

/// Finds category listings on the browse page
#[derive(Debug, Clone)]
pub struct CategoryCollector {
    container: Selector,
    anchor: Selector,
    page_anchor: Selector,
    origin: Url,
}

impl CategoryCollector {
    pub fn new(selectors: &DiscoverySelectors, origin: &str) -> ParsingResult<Self> {
        Ok(Self {
            container: compile_selector("discovery.explore_container", &selectors.explore_container)?,
            anchor: compile_selector("discovery.category_anchor", &selectors.category_anchor)?,
            page_anchor: compile_selector("discovery.page_category_anchor", &selectors.page_category_anchor)?,
            origin: parse_origin(origin)?,
        })
    }

    /// Categories in document order, unique by URL
    pub fn collect(&self, document: &Html) -> Vec<Category> {
        let scoped: Vec<ElementRef<'_>> = document
            .select(&self.container)
            .flat_map(|container| container.select(&self.anchor).collect::<Vec<_>>())
            .collect();

        let anchors = if scoped.is_empty() {
            debug!("Explore container has no category anchors, scanning whole page");
            document.select(&self.page_anchor).collect()
        } else {
            scoped
        };

        let mut seen = HashSet::new();
        anchors
            .into_iter()
            .filter_map(|anchor| self.category_from(&anchor))
            .filter(|category| seen.insert(category.url.clone()))
            .collect()
    }

    fn category_from(&self, anchor: &ElementRef<'_>) -> Option<Category> {
        let href = anchor.value().attr("href")?;
        let mut url = self.origin.join(href.trim()).ok()?;
        url.set_fragment(None);

        let name = Some(element_text(anchor))
            .filter(|n| !n.is_empty())
            .or_else(|| anchor.value().attr("aria-label").map(str::trim).filter(|n| !n.is_empty()).map(String::from))
            .or_else(|| anchor.value().attr("data-click-value").map(str::trim).filter(|n| !n.is_empty()).map(String::from))
            .or_else(|| {
                url.path_segments()?
                    .filter(|s| !s.is_empty())
                    .next_back()
                    .map(String::from)
            })?;

        Some(Category::new(name, url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.coursera.org";

    fn collector() -> LinkCollector {
        LinkCollector::new(&ListingSelectors::default(), ORIGIN, &["utm_source".to_string()]).unwrap()
    }

    #[test]
    fn test_fallback_locator_and_dedup() {
        let html = r#"<html><body>
            <a href="/learn/python">Python</a>
            <a href="/learn/python?utm_source=feed">Python again</a>
            <a href="https://www.coursera.org/learn/sql#reviews">SQL</a>
            <a href="/browse/data-science">Not a course</a>
        </body></html>"#;
        let links = collector().collect_from_source(html);
        let urls: Vec<&str> = links.iter().map(LinkEntry::as_str).collect();
        assert_eq!(urls, vec!["https://www.coursera.org/learn/python", "https://www.coursera.org/learn/sql"]);
    }

    #[test]
    fn test_primary_locator_wins_when_present() {
        let selectors = ListingSelectors {
            primary_link: "ul.cards li a".to_string(),
            ..ListingSelectors::default()
        };
        let collector = LinkCollector::new(&selectors, ORIGIN, &[]).unwrap();
        let html = r#"<ul class="cards"><li><a href="/learn/a">A</a></li></ul><a href="/learn/b">B</a>"#;
        let links = collector.collect_from_source(html);
        assert_eq!(links.len(), 1);
        assert!(links.contains(&LinkEntry::from_stored("https://www.coursera.org/learn/a", &[])));
    }

    #[test]
    fn test_empty_page_yields_empty_set() {
        assert!(collector().collect_from_source("<html></html>").is_empty());
    }

    #[test]
    fn test_invalid_origin() {
        assert!(LinkCollector::new(&ListingSelectors::default(), "not a url", &[]).is_err());
    }

    #[test]
    fn test_category_names_and_page_fallback() {
        let categories = CategoryCollector::new(&DiscoverySelectors::default(), ORIGIN).unwrap();
        let html = r#"<html><body>
            <a href="/browse/data-science">Data Science</a>
            <a href="/browse/business" aria-label="Business"></a>
            <a href="/browse/computer-science/"></a>
            <a href="/browse/data-science">Duplicate</a>
        </body></html>"#;
        let found = categories.collect(&Html::parse_document(html));
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Data Science", "Business", "computer-science"]);
        assert_eq!(found[0].url, "https://www.coursera.org/browse/data-science");
    }
}

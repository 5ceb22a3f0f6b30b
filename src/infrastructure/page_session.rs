//! Page session capability
//!
//! The harvester drives pages only through [`PageSession`]: navigate, read
//! the current source, locate elements, activate them and wait for a
//! condition. Any rendering backend can implement it; [`HttpPageSession`]
//! is a plain HTTP backend where activation follows the element's target.

use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::field_resolution::{compile_selector, element_text};
use crate::infrastructure::parsing::Locator;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use scraper::Html;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Identity of a located element: the page generation it was found on and
/// its position among the locator's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    pub generation: u64,
    pub ordinal: usize,
}

/// Snapshot of a located element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    pub id: ElementId,
    pub tag: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub displayed: bool,
}

impl ElementHandle {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `disabled` attribute present or `aria-disabled="true"`
    pub fn is_disabled(&self) -> bool {
        self.attributes.contains_key("disabled")
            || self.attr("aria-disabled").is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMethod {
    /// Programmatic activation, the primary method
    Script,
    /// Native interaction, used when scripted activation fails
    Native,
}

#[derive(Debug, Clone)]
pub enum WaitCondition {
    Present(Locator),
    Stale(ElementHandle),
}

#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn page_source(&mut self) -> Result<String>;

    async fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    async fn activate(&mut self, element: &ElementHandle, method: ActivationMethod) -> Result<()>;

    /// Wait up to `timeout`; `Ok(false)` when the condition never held
    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<bool>;

    fn current_url(&self) -> Option<&str>;
}

/// Locate elements in a page source. Kept synchronous: parsed HTML never
/// lives across an await point.
pub fn locate(html: &str, locator: &Locator, generation: u64) -> Result<Vec<ElementHandle>> {
    let selector = compile_selector("locator", &locator.css)?;
    let document = Html::parse_document(html);
    let handles = document
        .select(&selector)
        .map(|el| (element_text(&el), el))
        .filter(|(text, _)| locator.text_matches(text))
        .enumerate()
        .map(|(ordinal, (text, el))| {
            let attributes: BTreeMap<String, String> = el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            ElementHandle {
                id: ElementId { generation, ordinal },
                tag: el.value().name().to_string(),
                text,
                displayed: is_displayed(&attributes),
                attributes,
            }
        })
        .collect();
    Ok(handles)
}

fn is_displayed(attributes: &BTreeMap<String, String>) -> bool {
    if attributes.contains_key("hidden") {
        return false;
    }
    if attributes.get("aria-hidden").is_some_and(|v| v == "true") {
        return false;
    }
    let style: String = attributes
        .get("style")
        .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase())
        .unwrap_or_default();
    !(style.contains("display:none") || style.contains("visibility:hidden"))
}

struct LoadedPage {
    url: Url,
    html: String,
}

/// HTTP-backed session: every navigation is a fresh fetch and bumps the
/// page generation, which is what makes earlier handles stale.
pub struct HttpPageSession {
    client: Arc<HttpClient>,
    cancellation_token: CancellationToken,
    page_param: Option<String>,
    generation: u64,
    current: Option<LoadedPage>,
}

impl HttpPageSession {
    pub fn new(client: Arc<HttpClient>, cancellation_token: CancellationToken) -> Self {
        Self {
            client,
            cancellation_token,
            page_param: None,
            generation: 0,
            current: None,
        }
    }

    /// Controls without a link target advance this query parameter instead
    pub fn with_page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = Some(param.into());
        self
    }

    fn loaded(&self) -> Result<&LoadedPage> {
        self.current.as_ref().ok_or_else(|| anyhow!("No page loaded"))
    }

    fn link_target(&self, element: &ElementHandle) -> Result<Option<Url>> {
        let page = self.loaded()?;
        let href = element
            .attr("href")
            .or_else(|| element.attr("data-href"))
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"));
        match href {
            Some(href) => Ok(Some(page.url.join(href).with_context(|| format!("Invalid link target '{href}'"))?)),
            None => Ok(None),
        }
    }

    fn next_page_url(&self) -> Result<Option<Url>> {
        let Some(param) = &self.page_param else {
            return Ok(None);
        };
        let mut url = self.loaded()?.url.clone();
        let current: u32 = url
            .query_pairs()
            .find(|(k, _)| k == param)
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1);
        let others: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != param)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(others)
            .append_pair(param, &(current + 1).to_string());
        Ok(Some(url))
    }
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.client.fetch(url, &self.cancellation_token).await?;
        let final_url = Url::parse(&page.final_url).with_context(|| format!("Invalid final URL {}", page.final_url))?;
        self.generation += 1;
        self.current = Some(LoadedPage {
            url: final_url,
            html: page.body,
        });
        debug!("Loaded {} (generation {})", url, self.generation);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.loaded()?.html.clone())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let html = &self.loaded()?.html;
        locate(html, locator, self.generation)
    }

    async fn activate(&mut self, element: &ElementHandle, method: ActivationMethod) -> Result<()> {
        if element.id.generation != self.generation {
            bail!("Element handle is stale");
        }
        let target = match method {
            ActivationMethod::Script => self.link_target(element)?,
            ActivationMethod::Native => match self.link_target(element)? {
                Some(url) => Some(url),
                None => self.next_page_url()?,
            },
        };
        let Some(target) = target else {
            bail!("Element <{}> has no navigation target", element.tag);
        };
        self.navigate(target.as_str()).await
    }

    async fn wait_for(&mut self, condition: &WaitCondition, _timeout: Duration) -> Result<bool> {
        // A fetched page never changes after load, so one check is final
        match condition {
            WaitCondition::Present(locator) => Ok(!self.find(locator).await?.is_empty()),
            WaitCondition::Stale(handle) => Ok(handle.id.generation != self.generation),
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|page| page.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <button aria-label="Next Page" disabled>Next</button>
        <button class="pagination" aria-disabled="true">Next</button>
        <button id="go" style="display: none">Next page</button>
        <a href="/learn/a">Course A</a>
    </body></html>"#;

    #[test]
    fn test_locate_with_text_and_state() {
        let handles = locate(PAGE, &Locator::with_text("button", "next"), 4).unwrap();
        assert_eq!(handles.len(), 3);
        assert!(handles[0].is_disabled());
        assert!(handles[1].is_disabled());
        assert!(!handles[2].is_disabled());
        assert!(!handles[2].displayed);
        assert_eq!(handles[2].id, ElementId { generation: 4, ordinal: 2 });
    }

    #[test]
    fn test_locate_rejects_bad_selector() {
        assert!(locate(PAGE, &Locator::css("button[["), 1).is_err());
    }

    #[test]
    fn test_exact_text_match() {
        let handles = locate(PAGE, &Locator::with_exact_text("button", "Next"), 1).unwrap();
        assert_eq!(handles.len(), 2);
    }
}

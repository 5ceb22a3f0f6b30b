//! Link harvesting against a scripted page session
use anyhow::{bail, Result};
use async_trait::async_trait;
use course_harvest_lib::crawling::{Harvester, StopReason};
use course_harvest_lib::infrastructure::config::HarvestConfig;
use course_harvest_lib::infrastructure::link_store::{read_links, LinkStore};
use course_harvest_lib::infrastructure::page_session::{
    locate, ActivationMethod, ElementHandle, PageSession, WaitCondition,
};
use course_harvest_lib::infrastructure::parsing::{Locator, SelectorConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const ORIGIN: &str = "https://www.coursera.org";

/// How a category's "next" control behaves after the scripted pages run out
#[derive(Clone, Copy)]
enum Ending {
    /// Last page shows a disabled control
    Disabled,
    /// The control stays enabled and re-renders the last page forever
    Endless,
}

struct ScriptedSession {
    sites: HashMap<String, (Vec<String>, Ending)>,
    current: Option<(String, usize)>,
    generation: u64,
    refuse_activation: bool,
    activations: usize,
    /// `page_source` fails from this call on (1-based)
    fail_source_from: Option<usize>,
    source_calls: usize,
    cancel_on_activate: Option<CancellationToken>,
}

impl ScriptedSession {
    fn new() -> Self {
        Self {
            sites: HashMap::new(),
            current: None,
            generation: 0,
            refuse_activation: false,
            activations: 0,
            fail_source_from: None,
            source_calls: 0,
            cancel_on_activate: None,
        }
    }

    fn with_listing(mut self, url: &str, pages: Vec<Vec<&str>>, ending: Ending) -> Self {
        let count = pages.len();
        let rendered = pages
            .into_iter()
            .enumerate()
            .map(|(i, slugs)| listing_page(&slugs, i + 1 == count && matches!(ending, Ending::Disabled)))
            .collect();
        self.sites.insert(url.to_string(), (rendered, ending));
        self
    }

    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.sites.insert(url.to_string(), (vec![html.to_string()], Ending::Disabled));
        self
    }

    fn html(&self) -> Result<&str> {
        let Some((url, index)) = &self.current else {
            bail!("nothing loaded");
        };
        Ok(self.sites[url].0[*index].as_str())
    }
}

fn listing_page(slugs: &[&str], last: bool) -> String {
    let cards: String = slugs
        .iter()
        .map(|slug| format!(r#"<li><a href="/learn/{slug}?utm_source=listing">{slug}</a></li>"#))
        .collect();
    let next = if last {
        r#"<button aria-label="Next Page" disabled>Next</button>"#
    } else {
        r#"<button aria-label="Next Page">Next</button>"#
    };
    format!("<html><body><ul>{cards}</ul><nav>{next}</nav></body></html>")
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if !self.sites.contains_key(url) {
            bail!("404 {url}");
        }
        self.current = Some((url.to_string(), 0));
        self.generation += 1;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        self.source_calls += 1;
        if self.fail_source_from.is_some_and(|n| self.source_calls >= n) {
            bail!("renderer crashed");
        }
        Ok(self.html()?.to_string())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let generation = self.generation;
        locate(self.html()?, locator, generation)
    }

    async fn activate(&mut self, element: &ElementHandle, _method: ActivationMethod) -> Result<()> {
        if self.refuse_activation {
            bail!("element not interactable");
        }
        if element.id.generation != self.generation {
            bail!("stale element");
        }
        let Some((url, index)) = self.current.clone() else {
            bail!("nothing loaded");
        };
        let (pages, _) = &self.sites[&url];
        let next = (index + 1).min(pages.len() - 1);
        self.current = Some((url, next));
        self.generation += 1;
        self.activations += 1;
        if let Some(token) = &self.cancel_on_activate {
            token.cancel();
        }
        Ok(())
    }

    async fn wait_for(&mut self, condition: &WaitCondition, _timeout: Duration) -> Result<bool> {
        match condition {
            WaitCondition::Present(locator) => Ok(!self.find(locator).await?.is_empty()),
            WaitCondition::Stale(handle) => Ok(handle.id.generation != self.generation),
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|(url, _)| url.as_str())
    }
}

fn category_url(slug: &str) -> String {
    format!("{ORIGIN}/browse/{slug}")
}

fn harvest_config(categories: &[&str], max_pages: u32) -> HarvestConfig {
    HarvestConfig {
        categories: categories.iter().map(|slug| category_url(slug)).collect(),
        max_pages,
        page_delay_ms: 0,
        settle_delay_ms: 0,
        cookie_delay_ms: 0,
        wait_timeout_secs: 1,
        ..HarvestConfig::default()
    }
}

fn data_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| line.starts_with("http"))
        .map(String::from)
        .collect()
}

fn two_category_session() -> ScriptedSession {
    ScriptedSession::new()
        .with_listing(
            &category_url("data-science"),
            vec![vec!["python", "sql"], vec!["statistics", "python"]],
            Ending::Disabled,
        )
        .with_listing(&category_url("business"), vec![vec!["sql", "finance"]], Ending::Disabled)
}

#[tokio::test]
async fn harvesting_twice_writes_each_link_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.txt");
    let harvester = Harvester::new(harvest_config(&["data-science", "business"], 10), &SelectorConfig::default()).unwrap();
    let token = CancellationToken::new();

    let mut store = LinkStore::open(&path, &[]).unwrap();
    let first = harvester.run(&mut two_category_session(), &mut store, &token).await.unwrap();
    assert_eq!(first.run.new_written, 4);
    assert_eq!(first.run.unique_all, 4);

    let mut store = LinkStore::open(&path, &[]).unwrap();
    let second = harvester.run(&mut two_category_session(), &mut store, &token).await.unwrap();
    assert_eq!(second.run.new_written, 0);
    assert_eq!(second.run.unique_all, 4);

    let lines = data_lines(&path);
    assert_eq!(lines.len(), 4);
    assert!(lines.contains(&"https://www.coursera.org/learn/python".to_string()));
    assert_eq!(read_links(&path, &[]).unwrap().len(), 4);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("---- RUN START [").count(), 2);
    assert!(text.contains("(new_written=0, unique_all=4, duration="));
}

#[tokio::test]
async fn endless_next_control_stops_at_page_bound() {
    let dir = tempdir().unwrap();
    let harvester = Harvester::new(harvest_config(&["endless"], 3), &SelectorConfig::default()).unwrap();
    let mut session = ScriptedSession::new().with_listing(
        &category_url("endless"),
        vec![vec!["a"], vec!["b"]],
        Ending::Endless,
    );
    let mut store = LinkStore::open(dir.path().join("links.txt"), &[]).unwrap();

    let summary = harvester.run(&mut session, &mut store, &CancellationToken::new()).await.unwrap();
    let report = &summary.categories[0];
    assert_eq!(report.stop, Some(StopReason::MaxPages));
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.links_found, 2);
    assert_eq!(session.activations, 2);
}

#[tokio::test]
async fn disabled_next_control_ends_category() {
    let dir = tempdir().unwrap();
    let harvester = Harvester::new(harvest_config(&["data-science"], 50), &SelectorConfig::default()).unwrap();
    let mut store = LinkStore::open(dir.path().join("links.txt"), &[]).unwrap();

    let summary = harvester
        .run(&mut two_category_session(), &mut store, &CancellationToken::new())
        .await
        .unwrap();
    let report = &summary.categories[0];
    assert_eq!(report.stop, Some(StopReason::NoNext));
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.links_found, 3);
}

#[tokio::test]
async fn refused_activation_keeps_first_page_links() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.txt");
    let harvester = Harvester::new(harvest_config(&["data-science"], 50), &SelectorConfig::default()).unwrap();
    let mut session = two_category_session();
    session.refuse_activation = true;
    let mut store = LinkStore::open(&path, &[]).unwrap();

    let summary = harvester.run(&mut session, &mut store, &CancellationToken::new()).await.unwrap();
    assert_eq!(summary.categories[0].stop, Some(StopReason::ClickFailed));
    assert_eq!(summary.categories[0].pages_visited, 1);
    assert_eq!(data_lines(&path).len(), 2);
}

#[tokio::test]
async fn failing_category_does_not_abort_run() {
    let dir = tempdir().unwrap();
    let harvester = Harvester::new(harvest_config(&["missing", "business"], 5), &SelectorConfig::default()).unwrap();
    let mut store = LinkStore::open(dir.path().join("links.txt"), &[]).unwrap();

    let summary = harvester
        .run(&mut two_category_session(), &mut store, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.categories.len(), 2);
    assert_eq!(summary.categories[0].stop, None);
    assert_eq!(summary.categories[1].stop, Some(StopReason::NoNext));
    assert_eq!(summary.run.new_written, 2);
}

#[tokio::test]
async fn cancelled_run_still_writes_footer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.txt");
    let harvester = Harvester::new(harvest_config(&["data-science"], 5), &SelectorConfig::default()).unwrap();
    let mut store = LinkStore::open(&path, &[]).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let summary = harvester.run(&mut two_category_session(), &mut store, &token).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.run.new_written, 0);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("---- RUN END   ["));
}

#[tokio::test]
async fn categories_are_discovered_from_browse_page() {
    let config = HarvestConfig {
        browse_url: format!("{ORIGIN}/browse"),
        settle_delay_ms: 0,
        cookie_delay_ms: 0,
        ..HarvestConfig::default()
    };
    let browse = r#"<html><body>
        <button id="onetrust-accept-btn-handler">Accept</button>
        <a href="/browse/data-science">Data Science</a>
        <a href="/browse/business" aria-label="Business"></a>
        <a href="/browse/data-science#top">Data Science again</a>
        <a href="/learn/python">Python</a>
    </body></html>"#;
    let mut session = ScriptedSession::new().with_page(&config.browse_url, browse);
    let harvester = Harvester::new(config, &SelectorConfig::default()).unwrap();

    let categories = harvester
        .discover_categories(&mut session, &CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Data Science", "Business"]);
    assert_eq!(categories[1].url, "https://www.coursera.org/browse/business");
}

#[tokio::test]
async fn links_persisted_before_a_failure_count_toward_the_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.txt");
    let harvester = Harvester::new(harvest_config(&["data-science"], 10), &SelectorConfig::default()).unwrap();
    let mut session = ScriptedSession::new().with_listing(
        &category_url("data-science"),
        vec![vec!["python", "sql"], vec!["statistics"], vec!["finance"]],
        Ending::Disabled,
    );
    session.fail_source_from = Some(3);
    let mut store = LinkStore::open(&path, &[]).unwrap();

    let summary = harvester.run(&mut session, &mut store, &CancellationToken::new()).await.unwrap();
    let report = &summary.categories[0];
    assert_eq!(report.stop, None);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.links_found, 3);
    assert_eq!(report.new_written, 3);

    let stored = data_lines(&path).len();
    assert_eq!(stored, 3);
    assert_eq!(summary.run.new_written, stored);
    assert_eq!(summary.run.unique_all, stored);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("(new_written=3, unique_all=3, duration="));
}

#[tokio::test]
async fn cancellation_while_advancing_counts_only_read_pages() {
    let dir = tempdir().unwrap();
    let harvester = Harvester::new(harvest_config(&["data-science"], 10), &SelectorConfig::default()).unwrap();
    let token = CancellationToken::new();
    let mut session = two_category_session();
    session.cancel_on_activate = Some(token.clone());
    let mut store = LinkStore::open(dir.path().join("links.txt"), &[]).unwrap();

    let summary = harvester.run(&mut session, &mut store, &token).await.unwrap();
    let report = &summary.categories[0];
    assert_eq!(report.stop, Some(StopReason::Cancelled));
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.links_found, 2);
    assert!(summary.cancelled);
}

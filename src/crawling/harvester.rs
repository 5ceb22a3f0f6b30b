//! Link harvest run
//!
//! Discovers categories (or takes them from config), drains each one with the
//! [`PaginationController`] and brackets the run with header/footer lines in
//! the link store. The footer is written on every exit path, including
//! cancellation and category errors.

use crate::crawling::pagination::{pause, CategoryProgress, PaginationController, PaginationSettings, StopReason};
use crate::domain::course::{Category, LinkEntry};
use crate::infrastructure::config::HarvestConfig;
use crate::infrastructure::link_store::{LinkStore, RunSummary};
use crate::infrastructure::page_session::{ActivationMethod, PageSession};
use crate::infrastructure::parsing::config::{DiscoverySelectors, SelectorConfig};
use crate::infrastructure::parsing::link_collector::parse_origin;
use crate::infrastructure::parsing::{CategoryCollector, LinkCollector};
use anyhow::{Context, Result};
use scraper::Html;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Per-category line of the harvest report
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: Category,
    pub pages_visited: u32,
    pub links_found: usize,
    pub new_written: usize,
    /// `None` when the category failed before its walk finished
    pub stop: Option<StopReason>,
}

impl CategoryReport {
    fn new(category: &Category, progress: &CategoryProgress, stop: Option<StopReason>) -> Self {
        Self {
            category: category.clone(),
            pages_visited: progress.pages_visited,
            links_found: progress.links.len(),
            new_written: progress.new_written,
            stop,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub categories: Vec<CategoryReport>,
    pub run: RunSummary,
    pub cancelled: bool,
}

pub struct Harvester {
    config: HarvestConfig,
    discovery: DiscoverySelectors,
    categories: CategoryCollector,
    controller: PaginationController,
}

impl Harvester {
    pub fn new(config: HarvestConfig, selectors: &SelectorConfig) -> Result<Self> {
        let collector = LinkCollector::new(&selectors.listing, &config.origin, &config.strip_params)
            .context("Invalid listing selectors")?;
        let categories =
            CategoryCollector::new(&selectors.discovery, &config.origin).context("Invalid discovery selectors")?;
        let controller = PaginationController::new(
            selectors.listing.clone(),
            selectors.pagination.clone(),
            collector,
            PaginationSettings::from(&config),
        );

        Ok(Self {
            config,
            discovery: selectors.discovery.clone(),
            categories,
            controller,
        })
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    /// Categories to harvest: the configured list, else discovery on the browse page
    pub async fn categories<S>(&self, session: &mut S, cancellation_token: &CancellationToken) -> Result<Vec<Category>>
    where
        S: PageSession + ?Sized,
    {
        if !self.config.categories.is_empty() {
            let configured = self.configured_categories()?;
            info!("Using {} configured categories", configured.len());
            return Ok(configured);
        }
        self.discover_categories(session, cancellation_token).await
    }

    fn configured_categories(&self) -> Result<Vec<Category>> {
        let origin = parse_origin(&self.config.origin)?;
        let mut seen = BTreeSet::new();
        let mut categories = Vec::new();
        for raw in &self.config.categories {
            let url = origin
                .join(raw.trim())
                .with_context(|| format!("Invalid category URL '{raw}'"))?;
            let name = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back().map(String::from))
                .unwrap_or_else(|| url.to_string());
            if seen.insert(url.to_string()) {
                categories.push(Category::new(name, url.to_string()));
            }
        }
        Ok(categories)
    }

    /// Read category links from the browse page after dismissing consent and expanding "Show more"
    pub async fn discover_categories<S>(
        &self,
        session: &mut S,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<Category>>
    where
        S: PageSession + ?Sized,
    {
        let settings = *self.controller.settings();
        session
            .navigate(&self.config.browse_url)
            .await
            .with_context(|| format!("Failed to open browse page {}", self.config.browse_url))?;
        pause(settings.settle_delay, cancellation_token).await;
        self.controller.dismiss_cookies(session, cancellation_token).await;

        for locator in &self.discovery.show_more {
            let Ok(found) = session.find(locator).await else {
                continue;
            };
            if let Some(button) = found.into_iter().find(|b| b.displayed) {
                if let Err(e) = session.activate(&button, ActivationMethod::Script).await {
                    debug!("'Show more' did not activate: {:#}", e);
                } else {
                    pause(settings.cookie_delay, cancellation_token).await;
                }
                break;
            }
        }

        let source = session.page_source().await?;
        let categories = {
            let document = Html::parse_document(&source);
            self.categories.collect(&document)
        };

        info!("Found {} categories", categories.len());
        for category in &categories {
            debug!("- {}: {}", category.name, category.url);
        }
        if categories.is_empty() {
            warn!("No categories discovered on {}", self.config.browse_url);
        }
        Ok(categories)
    }

    /// Harvest every category into the store. Category failures are logged and skipped.
    pub async fn run<S>(
        &self,
        session: &mut S,
        store: &mut LinkStore,
        cancellation_token: &CancellationToken,
    ) -> Result<HarvestSummary>
    where
        S: PageSession + ?Sized,
    {
        store.begin_run()?;
        info!("== RUN START: {} links already stored ==", store.len());

        let mut seen_this_run: BTreeSet<LinkEntry> = BTreeSet::new();
        let mut reports = Vec::new();
        let result = self
            .harvest_categories(session, store, &mut seen_this_run, &mut reports, cancellation_token)
            .await;

        let run = store.end_run(seen_this_run.len())?;
        info!(
            "== RUN END (new_written={}, unique_all={}, duration={:.2}s) ==",
            run.new_written,
            run.unique_all,
            run.duration.as_secs_f64()
        );
        result?;

        Ok(HarvestSummary {
            categories: reports,
            run,
            cancelled: cancellation_token.is_cancelled(),
        })
    }

    async fn harvest_categories<S>(
        &self,
        session: &mut S,
        store: &mut LinkStore,
        seen_this_run: &mut BTreeSet<LinkEntry>,
        reports: &mut Vec<CategoryReport>,
        cancellation_token: &CancellationToken,
    ) -> Result<()>
    where
        S: PageSession + ?Sized,
    {
        let categories = self.categories(session, cancellation_token).await?;

        for category in &categories {
            if cancellation_token.is_cancelled() {
                warn!("Harvest cancelled before category {}", category.name);
                break;
            }

            info!("=== Scraping category: {} ===", category.name);
            let mut progress = CategoryProgress::default();
            let result = self
                .controller
                .run_category(session, category, store, &mut progress, cancellation_token)
                .await;
            seen_this_run.extend(progress.links.iter().cloned());

            match result {
                Ok(stop) => {
                    info!(
                        "=== {}: {} unique course links so far (new-written-this-cat={}, stop={}) ===",
                        category.name,
                        seen_this_run.len(),
                        progress.new_written,
                        stop
                    );
                    reports.push(CategoryReport::new(category, &progress, Some(stop)));
                }
                Err(e) => {
                    error!(
                        "Category {} failed after {} pages: {:#}",
                        category.name, progress.pages_visited, e
                    );
                    reports.push(CategoryReport::new(category, &progress, None));
                }
            }
        }
        Ok(())
    }
}

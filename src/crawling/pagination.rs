//! Per-category pagination
//!
//! A category is walked as a small state machine:
//! `Start -> Loaded -> Extracted -> Advancing -> Loaded | Done(reason)`.
//! Every page's links are persisted before the controller navigates away,
//! so an interrupted run keeps everything up to the page in flight.

use crate::domain::course::{Category, LinkEntry};
use crate::infrastructure::config::HarvestConfig;
use crate::infrastructure::link_store::LinkStore;
use crate::infrastructure::page_session::{ActivationMethod, ElementHandle, PageSession, WaitCondition};
use crate::infrastructure::parsing::config::{ListingSelectors, PaginationSelectors};
use crate::infrastructure::parsing::{LinkCollector, Locator};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a category walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// No eligible "next" control on the last page
    NoNext,
    /// A "next" control was found but no activation method worked
    ClickFailed,
    /// The page bound was reached
    MaxPages,
    /// Shutdown was requested
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::NoNext => "NO_NEXT",
            StopReason::ClickFailed => "CLICK_FAILED",
            StopReason::MaxPages => "MAX_PAGES",
            StopReason::Cancelled => "CANCELLED",
        };
        f.write_str(text)
    }
}

/// What a category walk has persisted so far. Owned by the caller, so it
/// stays accurate when the walk ends in an error.
#[derive(Debug, Clone, Default)]
pub struct CategoryProgress {
    /// Pages whose links were extracted and persisted
    pub pages_visited: u32,
    pub links: BTreeSet<LinkEntry>,
    pub new_written: usize,
}

/// Timing and bounds for a category walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub max_pages: u32,
    pub page_delay: Duration,
    pub settle_delay: Duration,
    pub cookie_delay: Duration,
    pub wait_timeout: Duration,
}

impl From<&HarvestConfig> for PaginationSettings {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            max_pages: config.max_pages.max(1),
            page_delay: config.page_delay(),
            settle_delay: config.settle_delay(),
            cookie_delay: config.cookie_delay(),
            wait_timeout: config.wait_timeout(),
        }
    }
}

#[derive(Debug)]
enum PageState {
    Start,
    Loaded,
    Extracted,
    Advancing(ElementHandle),
    Done(StopReason),
}

/// Sleep unless shutdown is requested first; `false` when cancelled
pub(crate) async fn pause(duration: Duration, cancellation_token: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancellation_token.is_cancelled();
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancellation_token.cancelled() => false,
    }
}

/// Walks the result pages of a category through a [`PageSession`]
pub struct PaginationController {
    listing: ListingSelectors,
    pagination: PaginationSelectors,
    collector: LinkCollector,
    settings: PaginationSettings,
}

impl PaginationController {
    pub fn new(
        listing: ListingSelectors,
        pagination: PaginationSelectors,
        collector: LinkCollector,
        settings: PaginationSettings,
    ) -> Self {
        Self {
            listing,
            pagination,
            collector,
            settings,
        }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    /// Activate the first displayed consent button, if any. Never fails.
    pub async fn dismiss_cookies<S>(&self, session: &mut S, cancellation_token: &CancellationToken) -> bool
    where
        S: PageSession + ?Sized,
    {
        for locator in &self.pagination.cookie_accept {
            let Ok(found) = session.find(locator).await else {
                continue;
            };
            if let Some(button) = found.into_iter().find(|b| b.displayed) {
                if let Err(e) = session.activate(&button, ActivationMethod::Script).await {
                    debug!("Cookie button '{}' did not activate: {:#}", locator.css, e);
                }
                pause(self.settings.cookie_delay, cancellation_token).await;
                return true;
            }
        }
        false
    }

    /// Drain one category, persisting each page's new links before advancing.
    ///
    /// `progress` is updated page by page; on `Err` it still holds everything
    /// written before the failure.
    pub async fn run_category<S>(
        &self,
        session: &mut S,
        category: &Category,
        store: &mut LinkStore,
        progress: &mut CategoryProgress,
        cancellation_token: &CancellationToken,
    ) -> Result<StopReason>
    where
        S: PageSession + ?Sized,
    {
        let mut reference: Option<ElementHandle> = None;
        let mut state = PageState::Start;

        let stop = loop {
            if cancellation_token.is_cancelled() && !matches!(state, PageState::Done(_)) {
                state = PageState::Done(StopReason::Cancelled);
            }

            state = match state {
                PageState::Start => {
                    session
                        .navigate(&category.url)
                        .await
                        .with_context(|| format!("Failed to open category {}", category.url))?;
                    self.dismiss_cookies(session, cancellation_token).await;
                    self.await_content(session).await;
                    PageState::Loaded
                }

                PageState::Loaded => {
                    let source = session.page_source().await?;
                    let page_links = self.collector.collect_from_source(&source);
                    let written = store
                        .append(&page_links)
                        .with_context(|| format!("Failed to persist links for {}", category.name))?;
                    progress.new_written += written;
                    progress.links.extend(page_links.iter().cloned());
                    progress.pages_visited += 1;

                    info!(
                        "[{}] Page {}: +{} (page-new-written={}, total {})",
                        category.name,
                        progress.pages_visited,
                        page_links.len(),
                        written,
                        progress.links.len()
                    );
                    PageState::Extracted
                }

                PageState::Extracted => {
                    if progress.pages_visited >= self.settings.max_pages {
                        PageState::Done(StopReason::MaxPages)
                    } else {
                        reference = self.capture_reference(session).await;
                        match self.find_next(session).await {
                            Some(control) => PageState::Advancing(control),
                            None => PageState::Done(StopReason::NoNext),
                        }
                    }
                }

                PageState::Advancing(control) => {
                    if !self.activate(session, &control).await {
                        PageState::Done(StopReason::ClickFailed)
                    } else {
                        self.await_change(session, reference.take(), cancellation_token).await;
                        if pause(self.settings.page_delay, cancellation_token).await {
                            PageState::Loaded
                        } else {
                            PageState::Done(StopReason::Cancelled)
                        }
                    }
                }

                PageState::Done(reason) => break reason,
            };
        };

        match stop {
            StopReason::NoNext => info!("[{}] Next button not found or disabled. Stopping.", category.name),
            StopReason::ClickFailed => warn!("[{}] Failed to activate the next button. Stopping.", category.name),
            StopReason::MaxPages => warn!("[{}] Reached the {}-page bound. Stopping.", category.name, self.settings.max_pages),
            StopReason::Cancelled => warn!("[{}] Cancelled after {} pages.", category.name, progress.pages_visited),
        }
        Ok(stop)
    }

    /// Bounded wait for the "content present" signal; absence only degrades extraction
    async fn await_content<S>(&self, session: &mut S)
    where
        S: PageSession + ?Sized,
    {
        let condition = WaitCondition::Present(self.listing.content_present.clone());
        match session.wait_for(&condition, self.settings.wait_timeout).await {
            Ok(true) => {}
            Ok(false) => warn!("Listing content did not appear within {:?}", self.settings.wait_timeout),
            Err(e) => warn!("Waiting for listing content failed: {:#}", e),
        }
    }

    async fn capture_reference<S>(&self, session: &mut S) -> Option<ElementHandle>
    where
        S: PageSession + ?Sized,
    {
        match session.find(&self.listing.reference_element).await {
            Ok(found) => found.into_iter().next(),
            Err(e) => {
                debug!("No reference element captured: {:#}", e);
                None
            }
        }
    }

    /// First present and enabled control, trying locators in order
    async fn find_next<S>(&self, session: &mut S) -> Option<ElementHandle>
    where
        S: PageSession + ?Sized,
    {
        for locator in &self.pagination.next {
            match session.find(locator).await {
                Ok(found) => {
                    if let Some(control) = found.into_iter().find(|c| !c.is_disabled()) {
                        debug!("Next control matched by {}", describe(locator));
                        return Some(control);
                    }
                }
                Err(e) => debug!("Next locator {} failed: {:#}", describe(locator), e),
            }
        }
        None
    }

    async fn activate<S>(&self, session: &mut S, control: &ElementHandle) -> bool
    where
        S: PageSession + ?Sized,
    {
        for method in [ActivationMethod::Script, ActivationMethod::Native] {
            match session.activate(control, method).await {
                Ok(()) => return true,
                Err(e) => debug!("{:?} activation failed: {:#}", method, e),
            }
        }
        false
    }

    /// Staleness of the captured reference, else the settle delay
    async fn await_change<S>(&self, session: &mut S, reference: Option<ElementHandle>, cancellation_token: &CancellationToken)
    where
        S: PageSession + ?Sized,
    {
        let changed = match reference {
            Some(handle) => matches!(
                session
                    .wait_for(&WaitCondition::Stale(handle), self.settings.wait_timeout)
                    .await,
                Ok(true)
            ),
            None => false,
        };
        if !changed {
            pause(self.settings.settle_delay, cancellation_token).await;
        }
    }
}

fn describe(locator: &Locator) -> String {
    match &locator.text {
        Some(text) => format!("'{}' containing '{}'", locator.css, text),
        None => format!("'{}'", locator.css),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config_bound_at_least_one_page() {
        let config = HarvestConfig {
            max_pages: 0,
            ..HarvestConfig::default()
        };
        let settings = PaginationSettings::from(&config);
        assert_eq!(settings.max_pages, 1);
        assert_eq!(settings.cookie_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::MaxPages.to_string(), "MAX_PAGES");
        assert_eq!(serde_json::to_string(&StopReason::NoNext).unwrap(), "\"NO_NEXT\"");
    }

    #[tokio::test]
    async fn test_pause_returns_false_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!pause(Duration::from_secs(30), &token).await);
        assert!(!pause(Duration::ZERO, &token).await);
        assert!(pause(Duration::ZERO, &CancellationToken::new()).await);
    }
}

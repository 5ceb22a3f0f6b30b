//! HTTP client for detail-page fetching with rate limiting and retry
//!
//! Requests are paced by a governor quota. A fetch makes a fixed number of
//! attempts: 2xx returns immediately, 403/429 back off linearly with the
//! attempt number, other statuses wait the base delay, transport errors back
//! off linearly.

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client, StatusCode,
};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// HTTP client configuration for page fetching
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub max_retries: u32,
    pub request_delay_ms: u64,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout_seconds: 25,
            max_requests_per_second: 2,
            max_retries: 3,
            request_delay_ms: 2000,
            follow_redirects: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch {url} after {attempts} attempts: {detail}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
        detail: String,
    },

    #[error("Fetch cancelled: {url}")]
    Cancelled { url: String },

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    pub fn last_status(&self) -> Option<u16> {
        match self {
            FetchError::Exhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Rate-limited HTTP client with a fixed retry policy
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let header = |value: &str, what: &str| {
            HeaderValue::from_str(value).map_err(|e| FetchError::Setup(format!("Invalid {what}: {e}")))
        };
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header(&config.user_agent, "user agent")?);
        headers.insert(ACCEPT_LANGUAGE, header(&config.accept_language, "accept language")?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        let per_second = NonZeroU32::new(config.max_requests_per_second)
            .ok_or_else(|| FetchError::Setup("Rate limit must be greater than 0".to_string()))?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Fetch a page, retrying per the configured policy
    pub async fn fetch(&self, url: &str, cancellation_token: &CancellationToken) -> Result<FetchedPage, FetchError> {
        let attempts = self.config.max_retries.max(1);
        let base_delay = Duration::from_millis(self.config.request_delay_ms);
        let mut last_status = None;
        let mut detail = String::from("no attempt made");

        for attempt in 1..=attempts {
            if cancellation_token.is_cancelled() {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            tokio::select! {
                () = self.rate_limiter.until_ready() => {},
                () = cancellation_token.cancelled() => {
                    return Err(FetchError::Cancelled { url: url.to_string() });
                }
            }

            info!("Fetching URL (attempt {}/{}): {}", attempt, attempts, url);
            let backoff = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status.as_u16());
                    if status.is_success() {
                        let final_url = response.url().to_string();
                        match response.text().await {
                            Ok(body) => {
                                debug!("Fetched {} ({} chars)", url, body.len());
                                return Ok(FetchedPage {
                                    url: url.to_string(),
                                    final_url,
                                    status: status.as_u16(),
                                    body,
                                });
                            }
                            Err(e) => {
                                detail = format!("failed to read body: {e}");
                                base_delay * attempt
                            }
                        }
                    } else {
                        detail = format!("HTTP {status}");
                        Self::status_backoff(status, base_delay, attempt)
                    }
                }
                Err(e) => {
                    detail = e.to_string();
                    base_delay * attempt
                }
            };

            warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, detail);
            if attempt < attempts {
                tokio::select! {
                    () = tokio::time::sleep(backoff) => {},
                    () = cancellation_token.cancelled() => {
                        return Err(FetchError::Cancelled { url: url.to_string() });
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_status,
            detail,
        })
    }

    fn status_backoff(status: StatusCode, base_delay: Duration, attempt: u32) -> Duration {
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            base_delay * attempt
        } else {
            base_delay
        }
    }
}

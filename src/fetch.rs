//! Page fetching with exponential backoff retry logic.
//!
//! This module provides the HTTP layer the scrapers run on. It includes
//! automatic retry with exponential backoff and jitter so a transiently
//! flaky listing page doesn't cost the whole source its digest entry.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`FetchPage`]: fetches one URL to an HTML string (implemented by
//!   [`HttpFetcher`] over a shared `reqwest` client)
//! - [`Navigate`]: one attempt at a source's navigation phase (load the
//!   listing page, resolve the embedded grid, load the first grid window)
//! - [`RetryNav`]: decorator that re-runs any [`Navigate`] implementation
//!   with bounded backoff
//!
//! Retries cover the navigation phase only. Once row scanning has begun,
//! failures propagate to the caller and abort that source.
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Default number of navigation retries before a source is given up on.
pub const NAV_MAX_RETRIES: usize = 5;
/// Default initial backoff delay between navigation retries.
pub const NAV_BASE_DELAY: StdDuration = StdDuration::from_secs(1);

/// Trait for fetching a page body by URL.
///
/// Implementors return the response body as a string. The scrapers take this
/// as their seam so tests can feed fixture HTML without a network.
pub trait FetchPage {
    /// Fetch `url` and return its body.
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// [`FetchPage`] implementation over a shared `reqwest::Client`.
///
/// One client is shared by every concurrently scraping source, so connections
/// to the same host are pooled and reused instead of opened per worker.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given connect/read timeout.
    pub fn new(timeout: StdDuration) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// One attempt at a source's navigation phase.
///
/// Implementors perform everything up to (and including) loading the first
/// grid window. An attempt either yields the navigated state or an error;
/// attempts must be independently repeatable from scratch.
pub trait Navigate {
    /// The navigated state produced by a successful attempt.
    type Output;

    /// Run one navigation attempt from scratch.
    async fn attempt(&self) -> Result<Self::Output, Box<dyn Error>>;
}

/// Decorator that adds exponential backoff retry logic to any [`Navigate`]
/// implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
///
/// Exhausting the budget surfaces the last attempt's error to the caller.
pub struct RetryNav<T> {
    /// The underlying navigation to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryNav<T>
where
    T: Navigate,
{
    /// Create a new retry wrapper around an existing [`Navigate`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Run the navigation until it succeeds or the retry budget is spent.
    ///
    /// Returns the successful output together with the number of attempts
    /// made, which the scrape summary logs report.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<(T::Output, usize), Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.attempt().await {
                Ok(out) => {
                    return Ok((out, attempt + 1));
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "navigation exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "navigation attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<T> fmt::Debug for RetryNav<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryNav")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

//! Page acquisition.
//!
//! The listing pages are an Angular application: content arrives after
//! script execution and pagination happens in-page, so plain HTTP GET sees
//! an empty shell. Everything goes through [`PageFetcher`], with the real
//! implementation driving a browser over CDP and tests substituting
//! scripted fixtures.

pub mod browser;

pub use browser::{BrowserFetcher, BrowserOptions};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::warn;

use crate::error::FetchError;

/// Driver for one category's listing session plus one-off detail loads.
#[async_trait]
pub trait PageFetcher {
    /// Navigate the listing view to `url` and wait for it to settle.
    async fn load(&mut self, url: &str) -> Result<(), FetchError>;

    /// Current rendered HTML of the listing view.
    async fn content(&mut self) -> Result<String, FetchError>;

    /// Advance the listing to its next page. `false` when there is no
    /// enabled next-page control, which ends pagination.
    async fn next_page(&mut self) -> Result<bool, FetchError>;

    /// Load a detail page in an isolated context and return its rendered
    /// HTML. The context is torn down before returning, success or not.
    async fn fetch_detail(&mut self, url: &str) -> Result<String, FetchError>;
}

/// Load `url` with up to `max_retries` attempts, backing off with a small
/// jitter between tries. Non-retryable failures surface immediately.
pub async fn load_with_retry<F: PageFetcher + Send>(
    fetcher: &mut F,
    url: &str,
    max_retries: u32,
) -> Result<(), FetchError> {
    let attempts = max_retries.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match fetcher.load(url).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(url, attempt, error = %err, "page load failed, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_err.unwrap_or_else(|| FetchError::Timeout {
        url: url.to_string(),
        attempts,
    }))
}

/// Linear backoff with sub-second jitter taken from the clock.
fn backoff_delay(attempt: u32) -> Duration {
    let jitter_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_millis()) % 500)
        .unwrap_or(250);
    Duration::from_millis(u64::from(attempt) * 1000 + jitter_ms)
}

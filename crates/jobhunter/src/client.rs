//! Fetch configuration and entry points
//!
//! This module provides the options shared by all content fetchers and a
//! convenience function that fetches a page with a local Chromium.
//! The retry logic itself lives in [`ContentFetcher`](crate::fetchers::ContentFetcher).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetchers::{ChromiumConfig, ChromiumLauncher, ContentFetcher};
use crate::types::PageContent;

/// Default number of navigation attempts
pub const DEFAULT_RETRIES: u32 = 3;

/// Navigation timeout per attempt
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait after navigation for client-side rendering
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Wait between failed attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default path of the saved authentication state
pub const DEFAULT_AUTH_FILE: &str = "auth.json";

/// Content regions tried in order before falling back to the page body
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#job-description",
    ".job-description",
    ".description",
];

/// Fetch options
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Navigation attempts per call; 0 is treated as 1
    pub retries: u32,
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,
    /// Pause after navigation before reading the page
    pub settle_delay: Duration,
    /// Pause between failed attempts
    pub retry_delay: Duration,
    /// Content region selectors, highest priority first
    pub content_selectors: Vec<String>,
    /// Minimum cleaned length for a matched region; shorter regions fall back to the body
    pub min_region_chars: usize,
    /// Saved authentication state to replay
    pub auth_state_path: PathBuf,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
            content_selectors: DEFAULT_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_region_chars: 0,
            auth_state_path: PathBuf::from(DEFAULT_AUTH_FILE),
        }
    }
}

impl FetchOptions {
    /// Set the retry budget
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the per-attempt navigation timeout
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the post-navigation settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the delay between failed attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replace the content selector list
    pub fn content_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the minimum region length gate
    pub fn min_region_chars(mut self, chars: usize) -> Self {
        self.min_region_chars = chars;
        self
    }

    /// Set the auth state file path
    pub fn auth_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_state_path = path.into();
        self
    }

    /// Attempts actually made (at least one)
    pub fn effective_retries(&self) -> u32 {
        self.retries.max(1)
    }
}

/// Fetch a job page with a headless local Chromium and default options
///
/// For custom browser or retry configuration, build a
/// [`ContentFetcher`] directly.
pub async fn fetch_page(url: &str) -> Result<PageContent, FetchError> {
    fetch_page_with_options(url, FetchOptions::default()).await
}

/// Fetch a job page with a headless local Chromium and custom options
pub async fn fetch_page_with_options(
    url: &str,
    options: FetchOptions,
) -> Result<PageContent, FetchError> {
    let fetcher = ContentFetcher::new(ChromiumLauncher::new(ChromiumConfig::default()), options);
    fetcher.fetch(url).await
}

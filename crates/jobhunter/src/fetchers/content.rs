//! Retrying content fetcher
//!
//! Handles one fetch call end to end:
//! - URL validation before any browser work
//! - Session launch, auth replay and stealth setup (once per call)
//! - Bounded navigation retries on the same session
//! - Content region discovery with body fallback
//! - Session release on every exit path

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::auth::AuthState;
use crate::client::FetchOptions;
use crate::convert::clean_text;
use crate::error::{AttemptError, FetchError};
use crate::fetchers::{BrowserSession, SessionLauncher};
use crate::types::{PageContent, TargetUrl};

/// Fetches cleaned page text through a browser session
pub struct ContentFetcher<L> {
    launcher: L,
    options: FetchOptions,
}

impl<L: SessionLauncher> ContentFetcher<L> {
    pub fn new(launcher: L, options: FetchOptions) -> Self {
        Self { launcher, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Validate `url` and fetch its content
    ///
    /// Invalid URLs fail before the browser is launched.
    pub async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        let target = TargetUrl::parse(url).inspect_err(|_| {
            error!(url, "Invalid URL provided");
        })?;
        self.fetch_target(&target).await
    }

    /// Fetch content for an already validated URL
    pub async fn fetch_target(&self, target: &TargetUrl) -> Result<PageContent, FetchError> {
        info!(
            launcher = self.launcher.name(),
            auth_state = %self.options.auth_state_path.display(),
            "Launching browser session"
        );
        let mut session = self.launcher.launch().await.map_err(FetchError::Launch)?;

        let result = self.run_session(&mut session, target).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser session");
        }

        result
    }

    async fn run_session(
        &self,
        session: &mut L::Session,
        target: &TargetUrl,
    ) -> Result<PageContent, FetchError> {
        self.restore_auth_state(session).await;
        session.apply_stealth().await.map_err(FetchError::Launch)?;
        self.fetch_with_retries(session, target).await
    }

    /// Missing or unusable auth state is never fatal
    async fn restore_auth_state(&self, session: &mut L::Session) {
        let path = &self.options.auth_state_path;
        match AuthState::load(path).await {
            Ok(Some(state)) => match session.restore_auth_state(&state).await {
                Ok(()) => info!(
                    path = %path.display(),
                    cookies = state.cookies.len(),
                    "Loaded authentication state"
                ),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to apply authentication state. Running without login state"
                ),
            },
            Ok(None) => warn!(
                path = %path.display(),
                "No auth state found. Running without login state"
            ),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Unusable auth state. Running without login state"
            ),
        }
    }

    async fn fetch_with_retries(
        &self,
        session: &mut L::Session,
        target: &TargetUrl,
    ) -> Result<PageContent, FetchError> {
        let attempts = self.options.effective_retries();
        let mut attempt = 1;

        loop {
            info!(url = %target, attempt, attempts, "Navigating");

            match self.attempt(session, target).await {
                Ok(content) => {
                    info!(
                        url = %target,
                        attempt,
                        chars = content.char_count(),
                        "Retrieved page content"
                    );
                    return Ok(content);
                }
                Err(cause) => {
                    warn!(url = %target, attempt, error = %cause, "Navigation attempt failed");

                    if attempt >= attempts {
                        error!(url = %target, attempts, "All navigation attempts failed");
                        return Err(FetchError::Navigation {
                            url: target.to_string(),
                            attempts,
                            cause,
                        });
                    }
                }
            }

            sleep(self.options.retry_delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        session: &mut L::Session,
        target: &TargetUrl,
    ) -> Result<PageContent, AttemptError> {
        let limit = self.options.navigation_timeout;
        timeout(limit, session.navigate(target.as_url()))
            .await
            .map_err(|_| AttemptError::Timeout(limit))??;

        sleep(self.options.settle_delay).await;

        let raw = self.discover_content(session).await?;
        PageContent::from_raw(&raw).ok_or(AttemptError::EmptyContent)
    }

    /// First matching region wins; otherwise the whole body
    async fn discover_content(&self, session: &mut L::Session) -> Result<String, AttemptError> {
        for selector in &self.options.content_selectors {
            match session.region_text(selector).await {
                Ok(Some(text)) => {
                    let chars = clean_text(&text).chars().count();
                    if chars > 0 && chars >= self.options.min_region_chars {
                        info!(selector = %selector, chars, "Found content region");
                        return Ok(text);
                    }
                    debug!(
                        selector = %selector,
                        chars,
                        min = self.options.min_region_chars,
                        "Content region too short"
                    );
                    break;
                }
                Ok(None) => {}
                Err(e) => debug!(selector = %selector, error = %e, "Selector query failed"),
            }
        }

        warn!("No specific content container found. Falling back to full body text");
        Ok(session.body_text().await?)
    }
}

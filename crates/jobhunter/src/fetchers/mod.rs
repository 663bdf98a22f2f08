//! Browser session abstraction and content fetching
//!
//! Design: a [`SessionLauncher`] produces one [`BrowserSession`] per fetch
//! call. [`ContentFetcher`] owns the policy (auth replay, stealth, retry,
//! selector fallback) and drives any session backend through this trait,
//! so the policy is the same for Chromium and for scripted test sessions.

mod chromium;
mod content;
mod stealth;

pub use chromium::{ChromiumConfig, ChromiumLauncher, ChromiumSession};
pub use content::ContentFetcher;
pub use stealth::STEALTH_SCRIPT;

use async_trait::async_trait;
use url::Url;

use crate::auth::AuthState;
use crate::error::SessionError;

/// One isolated browser tab with its own cookie jar
///
/// All methods are suspend points; none of them retries on its own.
#[async_trait]
pub trait BrowserSession: Send {
    /// Replay saved cookies and storage before the first navigation
    async fn restore_auth_state(&mut self, state: &AuthState) -> Result<(), SessionError>;

    /// Install anti-detection patches for every subsequent document
    async fn apply_stealth(&mut self) -> Result<(), SessionError>;

    /// Navigate to `url` and wait for the document to be ready
    async fn navigate(&mut self, url: &Url) -> Result<(), SessionError>;

    /// Visible text of the first element matching `selector`
    ///
    /// Returns `Ok(None)` when no element matches.
    async fn region_text(&mut self, selector: &str) -> Result<Option<String>, SessionError>;

    /// Visible text of the whole page body
    async fn body_text(&mut self) -> Result<String, SessionError>;

    /// Release the browser; further calls are invalid
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Factory for browser sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Start a fresh session
    async fn launch(&self) -> Result<Self::Session, SessionError>;
}

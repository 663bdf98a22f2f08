//! Error types for JobHunter

use std::time::Duration;

use thiserror::Error;

use crate::extract::ExtractionError;
use crate::render::RenderError;
use crate::settings::ConfigError;

/// Errors raised by a browser session backend
#[derive(Debug, Error)]
pub enum SessionError {
    /// Browser process could not be started or configured
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// A DevTools command was rejected or the connection dropped
    #[error("Browser command failed: {0}")]
    Command(String),

    /// In-page script evaluation failed or returned an unexpected value
    #[error("Script evaluation failed: {0}")]
    Evaluation(String),
}

/// Cause of a single failed navigation attempt
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Navigation did not finish within the configured timeout
    #[error("navigation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The browser reported an error while navigating or reading the page
    #[error(transparent)]
    Browser(#[from] SessionError),

    /// The page loaded but produced no text after cleaning
    #[error("retrieved empty page content")]
    EmptyContent,
}

/// Errors that can occur while fetching page content
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing a scheme or host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Browser session could not be set up
    #[error("Failed to start browser session")]
    Launch(#[source] SessionError),

    /// Every attempt in the retry budget failed
    #[error("Failed to navigate to {url} after {attempts} attempts: {cause}")]
    Navigation {
        url: String,
        attempts: u32,
        #[source]
        cause: AttemptError,
    },
}

/// Closed set of failure categories surfaced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Navigation,
    Extraction,
    Rendering,
    Configuration,
}

/// Top-level error for a pipeline run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Category of this error, used for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch(FetchError::InvalidUrl(_)) => ErrorKind::InvalidInput,
            Error::Fetch(_) => ErrorKind::Navigation,
            Error::Extraction(_) => ErrorKind::Extraction,
            Error::Render(_) => ErrorKind::Rendering,
            Error::Config(_) => ErrorKind::Configuration,
        }
    }
}

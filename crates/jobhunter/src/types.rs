//! Core types for JobHunter

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::convert::{clean_text, truncate_chars};
use crate::error::FetchError;

/// A validated job-posting URL (has both a scheme and a host)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    /// Parse and validate a URL string
    ///
    /// The scheme must be followed by a literal `://`; forms like
    /// `http:example.com` that the URL parser normalizes are rejected.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::InvalidUrl(input.to_string());
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|_| invalid())?;

        match trimmed.split_once("://") {
            Some((scheme, _)) if scheme.eq_ignore_ascii_case(url.scheme()) => {}
            _ => return Err(invalid()),
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self(url)),
            _ => Err(invalid()),
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for TargetUrl {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Cleaned visible text of a job page
///
/// Always non-empty; every line is trimmed and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent(String);

impl PageContent {
    /// Clean raw page text, returning `None` if nothing is left
    pub fn from_raw(raw: &str) -> Option<Self> {
        let cleaned = clean_text(raw);
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines()
    }

    /// Number of characters (not bytes)
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// Prefix of at most `max_chars` characters
    pub fn truncated(&self, max_chars: usize) -> &str {
        truncate_chars(&self.0, max_chars)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Saved browser authentication state
//!
//! Reads the `storage_state` document written by a prior interactive
//! login (cookies plus per-origin localStorage) so it can be replayed
//! into a fresh browser session.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading a saved authentication state file
#[derive(Debug, Error)]
pub enum AuthStateError {
    #[error("Failed to read auth state file: {0}")]
    Read(#[from] io::Error),

    #[error("Malformed auth state file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cookie `SameSite` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A cookie captured from a logged-in session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Unix timestamp in seconds; `-1` for session cookies
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl StoredCookie {
    pub fn is_session_cookie(&self) -> bool {
        self.expires <= 0.0
    }
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

/// A single localStorage key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

/// localStorage contents for one origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginStorage {
    pub origin: String,
    #[serde(rename = "localStorage", default)]
    pub local_storage: Vec<StorageEntry>,
}

/// Serialized cookies and storage from a prior interactive login
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

impl AuthState {
    /// Load auth state from `path`
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>, AuthStateError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(Self::from_json(&raw)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthStateError::Read(e)),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }

    /// Script that seeds localStorage for matching origins on every new document
    ///
    /// Returns `None` when there is no storage to restore.
    pub fn local_storage_script(&self) -> Option<String> {
        let entries: BTreeMap<&str, Vec<(&str, &str)>> = self
            .origins
            .iter()
            .filter(|o| !o.local_storage.is_empty())
            .map(|o| {
                let items = o
                    .local_storage
                    .iter()
                    .map(|e| (e.name.as_str(), e.value.as_str()))
                    .collect();
                (o.origin.as_str(), items)
            })
            .collect();

        if entries.is_empty() {
            return None;
        }

        // serde_json output is a valid JS literal, so names and values need no extra escaping
        let literal = serde_json::to_string(&entries).ok()?;
        Some(format!(
            "(() => {{ const items = ({literal})[window.location.origin]; \
             if (!items) return; \
             for (const [name, value] of items) {{ \
             try {{ window.localStorage.setItem(name, value); }} catch (e) {{}} }} }})();"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE_STATE: &str = r#"{
        "cookies": [
            {
                "name": "li_at",
                "value": "AQEDAR",
                "domain": ".linkedin.com",
                "path": "/",
                "expires": 1767225600.5,
                "httpOnly": true,
                "secure": true,
                "sameSite": "None"
            },
            {
                "name": "lang",
                "value": "v=2&lang=en-us",
                "domain": ".linkedin.com",
                "path": "/",
                "expires": -1,
                "httpOnly": false,
                "secure": true,
                "sameSite": "Lax"
            }
        ],
        "origins": [
            {
                "origin": "https://www.linkedin.com",
                "localStorage": [
                    {"name": "voyager-web:theme", "value": "\"light\""}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_storage_state() {
        let state = AuthState::from_json(STORAGE_STATE).unwrap();
        assert_eq!(state.cookies.len(), 2);
        assert_eq!(state.cookies[0].name, "li_at");
        assert!(state.cookies[0].http_only);
        assert_eq!(state.cookies[0].same_site, Some(SameSite::None));
        assert!(!state.cookies[0].is_session_cookie());
        assert!(state.cookies[1].is_session_cookie());
        assert_eq!(state.origins[0].local_storage.len(), 1);
        assert!(!state.is_empty());
    }

    #[test]
    fn test_parse_minimal_cookie() {
        let state = AuthState::from_json(
            r#"{"cookies": [{"name": "a", "value": "b", "domain": "example.com"}]}"#,
        )
        .unwrap();
        let cookie = &state.cookies[0];
        assert_eq!(cookie.path, "/");
        assert!(cookie.is_session_cookie());
        assert!(cookie.same_site.is_none());
        assert!(state.origins.is_empty());
    }

    #[test]
    fn test_local_storage_script() {
        let state = AuthState::from_json(STORAGE_STATE).unwrap();
        let script = state.local_storage_script().unwrap();
        assert!(script.contains("\"https://www.linkedin.com\""));
        assert!(script.contains("voyager-web:theme"));
        assert!(script.contains("\\\"light\\\""));
        assert!(script.contains("window.location.origin"));
    }

    #[test]
    fn test_no_script_without_storage() {
        let state = AuthState::default();
        assert!(state.is_empty());
        assert!(state.local_storage_script().is_none());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AuthState::load(&dir.path().join("auth.json")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = AuthState::load(&path).await.unwrap_err();
        assert!(matches!(err, AuthStateError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, STORAGE_STATE).unwrap();
        let state = AuthState::load(&path).await.unwrap().unwrap();
        assert_eq!(state.cookies.len(), 2);
    }
}

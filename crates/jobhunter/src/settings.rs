//! Runtime configuration
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file in the working directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::{FetchOptions, DEFAULT_AUTH_FILE, DEFAULT_RETRIES};
use crate::fetchers::ChromiumConfig;
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::render::{DEFAULT_OUTPUT_DIR, DEFAULT_STYLESHEET, DEFAULT_WKHTMLTOPDF};

pub const DEFAULT_BASE_CV: &str = "base_cv.md";
pub const DEFAULT_LOG_FILE: &str = "bot.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Failed to create chat model client")]
    Client(#[source] crate::llm::LlmError),

    #[error("Base CV not found at {}", .0.display())]
    BaseCvMissing(PathBuf),

    #[error("Failed to read base CV at {}", .path.display())]
    BaseCvRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a pipeline run needs from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub chromium: ChromiumConfig,
    pub wkhtmltopdf: PathBuf,
    pub auth_file: PathBuf,
    pub base_cv: PathBuf,
    pub output_dir: PathBuf,
    pub stylesheet: PathBuf,
    /// `None` disables the log file
    pub log_file: Option<PathBuf>,
    pub retries: u32,
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Browser settings alone; the model API key is not required
    pub fn chromium_from_env() -> Result<ChromiumConfig, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::chromium_from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `JOBHUNTER_HEADLESS`, `CHROME_EXECUTABLE` and `CHROME_USER_DATA_DIR`
    pub fn chromium_from_lookup<F>(lookup: F) -> Result<ChromiumConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let headless = match non_empty("JOBHUNTER_HEADLESS") {
            Some(value) => parse_bool("JOBHUNTER_HEADLESS", value)?,
            None => true,
        };

        Ok(ChromiumConfig {
            headless,
            executable: non_empty("CHROME_EXECUTABLE").map(PathBuf::from),
            user_data_dir: non_empty("CHROME_USER_DATA_DIR").map(PathBuf::from),
            extra_args: Vec::new(),
        })
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |key: &str| get(key).filter(|v| !v.is_empty());
        let path_or = |key: &str, default: &str| {
            PathBuf::from(non_empty(key).unwrap_or_else(|| default.to_string()))
        };

        let api_key = non_empty("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let chromium = Self::chromium_from_lookup(&lookup)?;

        let retries = match non_empty("JOBHUNTER_RETRIES") {
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "JOBHUNTER_RETRIES",
                        value,
                        reason: "expected a positive integer",
                    })
                }
            },
            None => DEFAULT_RETRIES,
        };

        // Set but empty disables file logging
        let log_file = match get("JOBHUNTER_LOG_FILE") {
            Some(v) if v.is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Ok(Self {
            api_key,
            base_url: non_empty("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: non_empty("JOBHUNTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            chromium,
            wkhtmltopdf: path_or("WKHTMLTOPDF_PATH", DEFAULT_WKHTMLTOPDF),
            auth_file: path_or("JOBHUNTER_AUTH_FILE", DEFAULT_AUTH_FILE),
            base_cv: path_or("JOBHUNTER_BASE_CV", DEFAULT_BASE_CV),
            output_dir: path_or("JOBHUNTER_OUTPUT_DIR", DEFAULT_OUTPUT_DIR),
            stylesheet: path_or("JOBHUNTER_STYLESHEET", DEFAULT_STYLESHEET),
            log_file,
            retries,
        })
    }

    /// Fetcher options derived from these settings
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .retries(self.retries)
            .auth_state_path(self.auth_file.clone())
    }
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected true or false",
        }),
    }
}

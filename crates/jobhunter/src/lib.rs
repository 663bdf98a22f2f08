//! JobHunter - automated job application pipeline
//!
//! This crate fetches a job posting with a real browser, extracts
//! structured job data with a language model, tailors a base CV to the
//! posting and renders it to PDF.
//!
//! ## Content Fetching
//!
//! [`ContentFetcher`] drives any [`SessionLauncher`] backend through
//! auth-state replay, stealth setup, bounded navigation retries and
//! content-region discovery. [`ChromiumLauncher`] is the production
//! backend.
//!
//! ## Pipeline
//!
//! [`Pipeline`] runs fetch → extract → tailor → render → submit for one
//! URL. Failures are classified by [`ErrorKind`]; tailoring is the only
//! stage that degrades silently.

pub mod auth;
pub mod client;
mod convert;
mod error;
pub mod extract;
pub mod fetchers;
pub mod llm;
mod pipeline;
pub mod render;
mod settings;
pub mod submit;
pub mod tailor;
mod types;

pub use auth::AuthState;
pub use client::{fetch_page, fetch_page_with_options, FetchOptions};
pub use convert::{clean_text, markdown_to_html};
pub use error::{AttemptError, Error, ErrorKind, FetchError, SessionError};
pub use extract::{ExtractionError, JobExtractor, JobRecord};
pub use fetchers::{BrowserSession, ChromiumConfig, ChromiumLauncher, ContentFetcher, SessionLauncher};
pub use llm::{ChatModel, ChatRequest, LlmError, OpenAiClient};
pub use pipeline::{ApplicationOutcome, Pipeline};
pub use render::{PdfRenderer, RenderError};
pub use settings::{ConfigError, Settings};
pub use submit::{InteractiveSubmitter, Submitter};
pub use tailor::CvTailor;
pub use types::{PageContent, TargetUrl};

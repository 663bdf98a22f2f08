//! Application pipeline
//!
//! Runs the stages for one job posting in order:
//! fetch → extract → tailor → render → submit.
//! Every stage failure halts the run except tailoring, which falls back
//! to the base CV, and submission, which is reported but not fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::error::Error;
use crate::extract::{JobExtractor, JobRecord};
use crate::fetchers::{ChromiumLauncher, ContentFetcher, SessionLauncher};
use crate::llm::{ChatModel, OpenAiClient};
use crate::render::{output_file_name, PdfRenderer};
use crate::settings::{ConfigError, Settings};
use crate::submit::{InteractiveSubmitter, Submitter};
use crate::tailor::{load_base_cv, CvTailor};
use crate::types::TargetUrl;

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct ApplicationOutcome {
    pub job: JobRecord,
    /// Rendered CV
    pub document: PathBuf,
    /// Whether the submitter confirmed the upload
    pub submitted: bool,
}

pub struct Pipeline<L> {
    fetcher: ContentFetcher<L>,
    extractor: JobExtractor,
    tailor: CvTailor,
    renderer: PdfRenderer,
    submitter: Box<dyn Submitter>,
    base_cv: PathBuf,
}

impl Pipeline<ChromiumLauncher> {
    /// Chromium fetcher plus OpenAI-compatible model, configured from `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        let client = OpenAiClient::new(&settings.api_key, &settings.base_url, &settings.model)
            .map_err(ConfigError::Client)?;
        let model: Arc<dyn ChatModel> = Arc::new(client);

        let fetcher = ContentFetcher::new(
            ChromiumLauncher::new(settings.chromium.clone()),
            settings.fetch_options(),
        );
        let renderer = PdfRenderer::new(&settings.wkhtmltopdf, &settings.output_dir)
            .with_stylesheet(&settings.stylesheet);

        Ok(Pipeline::new(fetcher, model, renderer, &settings.base_cv))
    }
}

impl<L: SessionLauncher> Pipeline<L> {
    /// Both model-backed stages share `model`; submission is interactive
    pub fn new(
        fetcher: ContentFetcher<L>,
        model: Arc<dyn ChatModel>,
        renderer: PdfRenderer,
        base_cv: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            extractor: JobExtractor::new(Arc::clone(&model)),
            tailor: CvTailor::new(model),
            renderer,
            submitter: Box::new(InteractiveSubmitter),
            base_cv: base_cv.into(),
        }
    }

    pub fn with_submitter(mut self, submitter: impl Submitter + 'static) -> Self {
        self.submitter = Box::new(submitter);
        self
    }

    pub fn base_cv_path(&self) -> &Path {
        &self.base_cv
    }

    /// Run every stage for the posting at `url`
    pub async fn run(&self, url: &str) -> Result<ApplicationOutcome, Error> {
        let target = TargetUrl::parse(url).inspect_err(|_| {
            error!(url, "Invalid URL provided");
        })?;
        let base_cv = load_base_cv(&self.base_cv).await?;

        info!(url = %target, "Starting application run");

        let content = self.fetcher.fetch_target(&target).await?;
        let job = self.extractor.extract(&content).await?;
        info!(
            title = job.title_or("Unknown"),
            company = job.company_or("Unknown"),
            hard_skills = job.hard_skills.len(),
            "Job data extracted"
        );

        let cv = self.tailor.tailor(&base_cv, &job).await;
        let document = self.renderer.render(&cv, &output_file_name(&job)).await?;

        let submitted = match self.submitter.submit(&target, &document).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Submission failed");
                false
            }
        };

        Ok(ApplicationOutcome {
            job,
            document,
            submitted,
        })
    }
}

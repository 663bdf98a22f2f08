//! CV tailoring
//!
//! Rewrites the base CV for one job through the chat model. This is the
//! one stage that degrades silently: any failure returns the base CV.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::convert::strip_code_fences;
use crate::extract::JobRecord;
use crate::llm::{ChatModel, ChatRequest};
use crate::settings::ConfigError;

const GUIDELINES: &str = "\
Role: You are an expert Resume Writer specializing in ATS (Applicant Tracking Systems) optimization.
Task: Adapt the provided Base CV for this specific Job Description to maximize the match score.

--- GUIDELINES ---
1. **Header**: PRESERVE the Name and Contact Information (Email, Phone, LinkedIn, etc.) exactly as they appear at the top of the Base CV, including its formatting.
2. **Professional Summary**: Rewrite to align with the job's core requirements. Use keywords from the job description naturally.
3. **Skills**: Reorder and filter skills. Prioritize the 10-15 most relevant Hard Skills from the job data, using the exact keywords.
4. **Experience**: Keep the history but rewrite at most 3-5 bullet points per role, focused on the accomplishments most relevant to this role. Use strong action verbs.
5. **Formatting**: Use standard Markdown headers in this order: # Name, ## Professional Summary, ## Skills, ## Experience, ## Education. No columns or complex tables.
6. **Output**: Return STRICTLY the Markdown content. No conversational filler.";

/// Read the base CV Markdown
pub async fn load_base_cv(path: &Path) -> Result<String, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::BaseCvMissing(path.to_path_buf()))
        }
        Err(source) => Err(ConfigError::BaseCvRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Build the rewriting prompt for one job
pub fn build_prompt(base_cv: &str, job: &JobRecord) -> String {
    format!(
        "{GUIDELINES}\n\n--- JOB DATA ---\n{}\n\n--- BASE CV ---\n{base_cv}",
        job.to_prompt_json()
    )
}

/// Rewrites CVs through a chat model
#[derive(Clone)]
pub struct CvTailor {
    model: Arc<dyn ChatModel>,
}

impl CvTailor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Tailor `base_cv` for `job`
    ///
    /// Never fails: on any model error the base CV is returned unchanged.
    pub async fn tailor(&self, base_cv: &str, job: &JobRecord) -> String {
        info!(title = job.title_or("Job"), "Tailoring CV");

        let request = ChatRequest::new(build_prompt(base_cv, job));
        match self.model.complete(&request).await {
            Ok(text) => {
                let rewritten = strip_code_fences(&text);
                if rewritten.is_empty() {
                    warn!("CV tailoring returned no content, using base CV");
                    base_cv.to_string()
                } else {
                    rewritten.to_string()
                }
            }
            Err(e) => {
                error!(error = %e, "CV tailoring error, using base CV");
                base_cv.to_string()
            }
        }
    }
}

//! Job record extraction
//!
//! Sends cleaned page text to the chat model and turns its JSON answer into
//! a typed [`JobRecord`]. Model output is loosely shaped, so the raw JSON is
//! normalized field by field before anything downstream sees it.

use std::sync::{Arc, OnceLock};

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::convert::strip_code_fences;
use crate::llm::{ChatModel, ChatRequest, LlmError};
use crate::types::PageContent;

/// Character budget for page text sent to the model
pub const MAX_INPUT_CHARS: usize = 15_000;

const EXTRACTION_INSTRUCTION: &str = "You are an expert data extraction agent. \
Extract the following fields from the job posting text provided: \
Job Title, Company Name, Required Hard Skills, Required Soft Skills, Job Description. \
Return the output strictly as a JSON object.";

/// Errors turning page text into a job record
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to extract job details: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to extract job details: LLM returned empty content")]
    EmptyResponse,

    #[error("Failed to extract job details: response is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Failed to extract job details: {0}")]
    Shape(String),
}

/// Structured data about one job posting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    #[serde(rename = "Job Title", default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,

    #[serde(rename = "Company Name", default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(rename = "Required Hard Skills", default)]
    pub hard_skills: Vec<String>,

    #[serde(rename = "Required Soft Skills", default)]
    pub soft_skills: Vec<String>,

    #[serde(rename = "Job Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which record field a response key maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Company,
    HardSkills,
    SoftSkills,
    Description,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "jobtitle" | "title" | "position" | "role" => Some(Field::Title),
            "companyname" | "company" | "employer" => Some(Field::Company),
            "requiredhardskills" | "hardskills" => Some(Field::HardSkills),
            "requiredsoftskills" | "softskills" => Some(Field::SoftSkills),
            "jobdescription" | "description" => Some(Field::Description),
            _ => None,
        }
    }
}

impl JobRecord {
    /// Parse raw model output (optionally fenced) into a record
    pub fn parse_response(raw: &str) -> Result<Self, ExtractionError> {
        let body = strip_code_fences(raw);
        if body.is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }
        let value: Value = serde_json::from_str(body).map_err(ExtractionError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Validate and normalize a parsed JSON value
    ///
    /// Keys are matched ignoring case and punctuation. Skills may be an
    /// array of strings or a comma/newline separated string.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ExtractionError::Shape(format!(
                    "expected a JSON object, got {}",
                    type_name(&other)
                )))
            }
        };

        let mut record = JobRecord::default();
        let mut recognized = 0;

        for (key, value) in map {
            let Some(field) = Field::from_key(&key) else {
                debug!(key = %key, "Ignoring unexpected field in extraction response");
                continue;
            };
            recognized += 1;

            match field {
                Field::Title => record.job_title = text_field(&key, value)?,
                Field::Company => record.company_name = text_field(&key, value)?,
                Field::Description => record.description = description_field(&key, value)?,
                Field::HardSkills => record.hard_skills = skills_field(&key, value)?,
                Field::SoftSkills => record.soft_skills = skills_field(&key, value)?,
            }
        }

        if recognized == 0 {
            return Err(ExtractionError::Shape(
                "response contains none of the expected fields".to_string(),
            ));
        }

        Ok(record)
    }

    /// Job title, or `fallback` when the posting had none
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.job_title.as_deref().unwrap_or(fallback)
    }

    /// Company name, or `fallback` when the posting had none
    pub fn company_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.company_name.as_deref().unwrap_or(fallback)
    }

    /// Pretty JSON for embedding in prompts
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn shape_error(key: &str, expected: &str, value: &Value) -> ExtractionError {
    ExtractionError::Shape(format!(
        "field '{key}' should be {expected}, got {}",
        type_name(value)
    ))
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_field(key: &str, value: Value) -> Result<Option<String>, ExtractionError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(non_empty(&s)),
        other => Err(shape_error(key, "a string", &other)),
    }
}

fn description_field(key: &str, value: Value) -> Result<Option<String>, ExtractionError> {
    match value {
        Value::Array(items) => {
            let lines = string_items(key, items)?;
            Ok(non_empty(&lines.join("\n")))
        }
        other => text_field(key, other),
    }
}

fn skills_field(key: &str, value: Value) -> Result<Vec<String>, ExtractionError> {
    let items = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s
            .split(|c: char| c == ',' || c == '\n' || c == ';')
            .filter_map(non_empty)
            .collect(),
        Value::Array(items) => string_items(key, items)?,
        other => return Err(shape_error(key, "a list of strings", &other)),
    };

    let mut seen = std::collections::HashSet::new();
    Ok(items
        .into_iter()
        .filter(|skill| seen.insert(skill.to_lowercase()))
        .collect())
}

fn string_items(key: &str, items: Vec<Value>) -> Result<Vec<String>, ExtractionError> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => non_empty(&s).map(Ok),
            Value::Null => None,
            other => Some(Err(shape_error(key, "a list of strings", &other))),
        })
        .collect()
}

/// System instruction naming the five fields plus their JSON schema
pub fn system_prompt() -> &'static str {
    static PROMPT: OnceLock<String> = OnceLock::new();
    PROMPT.get_or_init(|| {
        let schema = serde_json::to_string_pretty(&schema_for!(JobRecord)).unwrap_or_default();
        format!("{EXTRACTION_INSTRUCTION}\nThe JSON object must follow this schema:\n{schema}")
    })
}

/// Extracts job records through a chat model
#[derive(Clone)]
pub struct JobExtractor {
    model: Arc<dyn ChatModel>,
    max_input_chars: usize,
}

impl JobExtractor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_input_chars: MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Extract a job record from page content
    ///
    /// Not retried: an unusable answer is surfaced immediately.
    pub async fn extract(&self, content: &PageContent) -> Result<JobRecord, ExtractionError> {
        let text = content.truncated(self.max_input_chars);
        info!(
            chars = text.chars().count(),
            truncated = text.len() < content.as_str().len(),
            "Sending raw text to LLM for extraction"
        );

        let request = ChatRequest::new(format!("Analyze this text:\n\n{text}"))
            .system(system_prompt())
            .json();

        let result = match self.model.complete(&request).await {
            Ok(raw) => JobRecord::parse_response(&raw),
            Err(LlmError::EmptyContent) => Err(ExtractionError::EmptyResponse),
            Err(e) => Err(ExtractionError::Llm(e)),
        };

        match result {
            Ok(record) => {
                info!(
                    title = record.title_or("?"),
                    company = record.company_or("?"),
                    hard_skills = record.hard_skills.len(),
                    "Extraction successful"
                );
                Ok(record)
            }
            Err(e) => {
                error!(error = %e, "LLM extraction error");
                Err(e)
            }
        }
    }
}

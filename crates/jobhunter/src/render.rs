//! CV rendering
//!
//! Markdown is converted to a styled HTML page, which `wkhtmltopdf`
//! turns into the PDF artifact.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::convert::markdown_to_html;
use crate::extract::JobRecord;

/// Default converter binary, resolved through `PATH`
pub const DEFAULT_WKHTMLTOPDF: &str = "wkhtmltopdf";

/// Default directory for generated CVs
pub const DEFAULT_OUTPUT_DIR: &str = "generated_cvs";

/// Default stylesheet location
pub const DEFAULT_STYLESHEET: &str = "assets/style.css";

/// Placeholder when the company name is unknown or has no usable characters
const FALLBACK_COMPANY: &str = "Company";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create output directory {}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start PDF converter '{}'", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("PDF converter I/O failed")]
    Io(#[from] io::Error),

    #[error("PDF converter exited with {status}: {stderr}")]
    Converter { status: String, stderr: String },
}

/// Company name reduced to alphanumeric characters
pub fn sanitize_company(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Deterministic artifact name for a job: `CV_<Company>.pdf`
pub fn output_file_name(job: &JobRecord) -> String {
    let company = job
        .company_name
        .as_deref()
        .map(sanitize_company)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_COMPANY.to_string());
    format!("CV_{company}.pdf")
}

/// Wrap an HTML fragment into a UTF-8 document with inline CSS
pub fn html_document(body: &str, css: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\n{css}\n</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

/// Renders Markdown CVs to PDF files
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    converter: PathBuf,
    output_dir: PathBuf,
    stylesheet: Option<PathBuf>,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            converter: PathBuf::from(DEFAULT_WKHTMLTOPDF),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            stylesheet: Some(PathBuf::from(DEFAULT_STYLESHEET)),
        }
    }
}

impl PdfRenderer {
    pub fn new(converter: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            converter: converter.into(),
            output_dir: output_dir.into(),
            stylesheet: None,
        }
    }

    pub fn with_stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylesheet = Some(path.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn load_css(&self) -> String {
        let Some(path) = &self.stylesheet else {
            return String::new();
        };
        match tokio::fs::read_to_string(path).await {
            Ok(css) => css,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Stylesheet not found, using default styles");
                String::new()
            }
        }
    }

    /// Markdown to a complete styled HTML page
    pub async fn render_html(&self, markdown: &str) -> String {
        let css = self.load_css().await;
        html_document(&markdown_to_html(markdown), &css)
    }

    /// Render `markdown` to `<output_dir>/<file_name>` and return the path
    pub async fn render(&self, markdown: &str, file_name: &str) -> Result<PathBuf, RenderError> {
        info!(file = file_name, "Generating PDF");

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RenderError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;
        let output_path = self.output_dir.join(file_name);
        let html = self.render_html(markdown).await;

        let result = self.convert(&html, &output_path).await;
        match &result {
            Ok(()) => info!(path = %output_path.display(), "PDF saved"),
            Err(e) => error!(error = %e, "PDF generation error"),
        }
        result.map(|()| output_path)
    }

    async fn convert(&self, html: &str, output_path: &Path) -> Result<(), RenderError> {
        let mut child = Command::new(&self.converter)
            .args(["--quiet", "--encoding", "UTF-8", "-"])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.converter.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(html.as_bytes()).await {
                Ok(()) => {}
                // Converter exited before reading everything; its status
                // and stderr below carry the real failure
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!(error = %e, "Converter closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
            // Dropping stdin closes the pipe so the converter sees EOF
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(RenderError::Converter {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

//! Application submission
//!
//! Only an interactive stand-in exists today: the operator uploads the
//! document by hand and confirms in the terminal.

use std::io::{self, BufRead, Write};
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::types::TargetUrl;

/// Submits a rendered application document
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, url: &TargetUrl, document: &Path) -> io::Result<()>;
}

/// Asks the operator to upload the document and press Enter
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveSubmitter;

#[async_trait]
impl Submitter for InteractiveSubmitter {
    async fn submit(&self, url: &TargetUrl, document: &Path) -> io::Result<()> {
        info!(url = %url, "Preparing to submit application");
        info!(document = %document.display(), "CV to upload");

        let prompt = format!(
            "\n>>> ACTION REQUIRED: Navigate to {url} and upload {}\n>>> Press ENTER to simulate clicking 'Submit Application'...",
            document.display()
        );

        tokio::task::spawn_blocking(move || {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{prompt}")?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(io::Error::other)??;

        info!("Upload sequence initiated (simulated)");
        info!("Application tracked");
        Ok(())
    }
}

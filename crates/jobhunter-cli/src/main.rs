//! JobHunter CLI - apply to a job posting from the command line

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use jobhunter::{
    ChromiumConfig, ChromiumLauncher, ContentFetcher, FetchOptions, PageContent, Pipeline,
    Settings,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Plain text with metadata frontmatter
    #[default]
    Text,
    /// JSON format
    Json,
}

/// JobHunter - tailor a CV to a job posting and apply
#[derive(Parser, Debug)]
#[command(name = "jobhunter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline for one job posting
    Apply {
        /// Job posting URL; prompted for when omitted
        url: Option<String>,
    },
    /// Fetch a job page and print its cleaned text
    Fetch {
        /// URL to fetch
        url: String,

        /// Output format
        #[arg(long, short, default_value = "text")]
        output: OutputFormat,

        /// Navigation attempts before giving up
        #[arg(long, default_value_t = jobhunter::client::DEFAULT_RETRIES)]
        retries: u32,

        /// Saved browser auth state
        #[arg(long, default_value = jobhunter::client::DEFAULT_AUTH_FILE)]
        auth_file: PathBuf,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Browser executable [default: CHROME_EXECUTABLE or auto-detected]
        #[arg(long, value_name = "PATH")]
        chrome: Option<PathBuf>,

        /// Browser profile directory [default: CHROME_USER_DATA_DIR or a temporary profile]
        #[arg(long, value_name = "PATH")]
        user_data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Apply { url }) => run_apply(url).await,
        Some(Commands::Fetch {
            url,
            output,
            retries,
            auth_file,
            headed,
            chrome,
            user_data_dir,
        }) => {
            init_logging(None);
            let config = match Settings::chromium_from_env() {
                Ok(config) => browser_overrides(config, headed, chrome, user_data_dir),
                Err(e) => {
                    error!(error = %error_chain(&e), "Configuration error");
                    return ExitCode::FAILURE;
                }
            };
            let options = FetchOptions::default()
                .retries(retries)
                .auth_state_path(auth_file);
            run_fetch(&url, output, config, options).await
        }
        None => {
            eprintln!("Usage: jobhunter apply [URL]");
            eprintln!("   or: jobhunter fetch <URL>");
            eprintln!("   or: jobhunter --help");
            ExitCode::FAILURE
        }
    }
}

/// Console logging plus an optional append-only log file
fn init_logging(log_file: Option<&Path>) {
    let file_layer = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        ),
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", path.display(), e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

async fn run_apply(url: Option<String>) -> ExitCode {
    let settings = Settings::from_env();
    let log_file = settings.as_ref().ok().and_then(|s| s.log_file.clone());
    init_logging(log_file.as_deref());

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %error_chain(&e), "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let url = match url {
        Some(url) => url,
        None => match prompt_url() {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Failed to read URL from stdin");
                return ExitCode::FAILURE;
            }
        },
    };

    let pipeline = match Pipeline::from_settings(&settings) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(kind = ?e.kind(), error = %error_chain(&e), "Failed to set up pipeline");
            return ExitCode::FAILURE;
        }
    };

    info!("Bot initialized");
    let task = tokio::spawn(async move { pipeline.run(&url).await });

    match task.await {
        Ok(Ok(outcome)) => {
            info!(
                document = %outcome.document.display(),
                submitted = outcome.submitted,
                "Application run finished"
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(kind = ?e.kind(), error = %error_chain(&e), "Application run failed");
            ExitCode::FAILURE
        }
        Err(e) if e.is_panic() => {
            error!(error = ?e, "Unexpected failure in pipeline task");
            ExitCode::FAILURE
        }
        Err(e) => {
            warn!(error = %e, "Pipeline task cancelled");
            ExitCode::FAILURE
        }
    }
}

/// Command-line flags take precedence over the environment
fn browser_overrides(
    mut config: ChromiumConfig,
    headed: bool,
    chrome: Option<PathBuf>,
    user_data_dir: Option<PathBuf>,
) -> ChromiumConfig {
    if headed {
        config.headless = false;
    }
    if chrome.is_some() {
        config.executable = chrome;
    }
    if user_data_dir.is_some() {
        config.user_data_dir = user_data_dir;
    }
    config
}

fn prompt_url() -> io::Result<String> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "Enter Job URL: ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run_fetch(
    url: &str,
    output: OutputFormat,
    config: ChromiumConfig,
    options: FetchOptions,
) -> ExitCode {
    let fetcher = ContentFetcher::new(ChromiumLauncher::new(config), options);

    match fetcher.fetch(url).await {
        Ok(content) => {
            match output {
                OutputFormat::Text => writeln_safe(&format_text_with_frontmatter(url, &content)),
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "url": url,
                        "chars": content.char_count(),
                        "content": content.as_str(),
                    });
                    match serde_json::to_string_pretty(&json) {
                        Ok(s) => writeln_safe(&s),
                        Err(e) => {
                            eprintln!("Error serializing response: {}", e);
                            return ExitCode::FAILURE;
                        }
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

/// Format page content as text with YAML frontmatter
fn format_text_with_frontmatter(url: &str, content: &PageContent) -> String {
    let mut output = String::new();
    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", url));
    output.push_str(&format!("chars: {}\n", content.char_count()));
    output.push_str(&format!("lines: {}\n", content.lines().count()));
    output.push_str("---\n");
    output.push_str(content.as_str());
    output
}

/// Error message followed by each of its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

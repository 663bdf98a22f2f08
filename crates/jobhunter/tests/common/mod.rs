//! Shared test fixtures: a scripted browser backend and log capture

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobhunter::{AuthState, BrowserSession, FetchOptions, SessionError, SessionLauncher};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

/// A page as the scripted browser sees it
#[derive(Debug, Clone, Default)]
pub struct Page {
    regions: Vec<(String, String)>,
    /// Selectors whose query raises a script error
    broken: Vec<String>,
    body: String,
}

impl Page {
    pub fn body(text: &str) -> Self {
        Self {
            body: text.to_string(),
            ..Default::default()
        }
    }

    pub fn region(mut self, selector: &str, text: &str) -> Self {
        self.regions.push((selector.to_string(), text.to_string()));
        self
    }

    pub fn broken_selector(mut self, selector: &str) -> Self {
        self.broken.push(selector.to_string());
        self
    }
}

/// Outcome of one navigation
#[derive(Debug, Clone)]
pub enum Step {
    Fail(&'static str),
    /// Navigation never completes
    Hang,
    Load(Page),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub navigations: AtomicUsize,
    pub closes: AtomicUsize,
    pub stealth: AtomicUsize,
    pub auth_restores: AtomicUsize,
    pub restored_cookies: AtomicUsize,
    pub region_queries: AtomicUsize,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Launcher whose sessions replay a fixed list of navigation outcomes
///
/// The last step repeats once the script runs out.
pub struct ScriptedLauncher {
    steps: Arc<Mutex<VecDeque<Step>>>,
    counters: Arc<Counters>,
    fail_launch: bool,
    fail_stealth: bool,
}

impl ScriptedLauncher {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            counters: Arc::new(Counters::default()),
            fail_launch: false,
            fail_stealth: false,
        }
    }

    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_stealth(steps: Vec<Step>) -> Self {
        Self {
            fail_stealth: true,
            ..Self::new(steps)
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    type Session = ScriptedSession;

    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn launch(&self) -> Result<ScriptedSession, SessionError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(SessionError::Launch("no browser available".to_string()));
        }
        Ok(ScriptedSession {
            steps: Arc::clone(&self.steps),
            counters: Arc::clone(&self.counters),
            fail_stealth: self.fail_stealth,
            page: None,
        })
    }
}

pub struct ScriptedSession {
    steps: Arc<Mutex<VecDeque<Step>>>,
    counters: Arc<Counters>,
    fail_stealth: bool,
    page: Option<Page>,
}

impl ScriptedSession {
    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap_or(Step::Fail("script is empty"))
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn restore_auth_state(&mut self, state: &AuthState) -> Result<(), SessionError> {
        self.counters.auth_restores.fetch_add(1, Ordering::SeqCst);
        self.counters
            .restored_cookies
            .store(state.cookies.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn apply_stealth(&mut self) -> Result<(), SessionError> {
        self.counters.stealth.fetch_add(1, Ordering::SeqCst);
        if self.fail_stealth {
            return Err(SessionError::Command("init script rejected".to_string()));
        }
        Ok(())
    }

    async fn navigate(&mut self, _url: &Url) -> Result<(), SessionError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.page = None;
        match self.next_step() {
            Step::Fail(reason) => Err(SessionError::Command(reason.to_string())),
            Step::Hang => std::future::pending().await,
            Step::Load(page) => {
                self.page = Some(page);
                Ok(())
            }
        }
    }

    async fn region_text(&mut self, selector: &str) -> Result<Option<String>, SessionError> {
        self.counters.region_queries.fetch_add(1, Ordering::SeqCst);
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| SessionError::Evaluation("no document loaded".to_string()))?;
        if page.broken.iter().any(|s| s == selector) {
            return Err(SessionError::Evaluation(format!(
                "SyntaxError: '{selector}' is not a valid selector"
            )));
        }
        Ok(page
            .regions
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, text)| text.clone()))
    }

    async fn body_text(&mut self) -> Result<String, SessionError> {
        self.page
            .as_ref()
            .map(|p| p.body.clone())
            .ok_or_else(|| SessionError::Evaluation("no document loaded".to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Default timings with the auth file pointed into `dir`
pub fn options_in(dir: &Path) -> FetchOptions {
    FetchOptions::default().auth_state_path(dir.join("auth.json"))
}

/// Same as [`options_in`] with no settle or retry delays
pub fn fast_options_in(dir: &Path) -> FetchOptions {
    options_in(dir)
        .settle_delay(Duration::ZERO)
        .retry_delay(Duration::ZERO)
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture logs for the current thread until the guard is dropped
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

//! Chromium session backend over the DevTools protocol

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventDomContentEventFired, NavigateParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::auth::{AuthState, SameSite, StoredCookie};
use crate::error::SessionError;
use crate::fetchers::stealth::STEALTH_SCRIPT;
use crate::fetchers::{BrowserSession, SessionLauncher};

/// Flags that hide the most obvious automation markers
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Library defaults worth keeping once they are disabled wholesale
///
/// `--enable-automation` is deliberately absent: it shows the automation
/// banner and sets `navigator.webdriver`.
const BASE_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--metrics-recording-only",
    "--password-store=basic",
    "--use-mock-keychain",
    "--lang=en-US",
];

/// Complete argument list passed to the browser on top of
/// port, profile and headless flags
pub fn launch_args(config: &ChromiumConfig) -> Vec<String> {
    BASE_ARGS
        .iter()
        .chain(STEALTH_ARGS)
        .map(|s| s.to_string())
        .chain(
            config
                .extra_args
                .iter()
                .filter(|arg| arg.as_str() != "--enable-automation")
                .cloned(),
        )
        .collect()
}

/// Chromium launch settings
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    pub headless: bool,
    /// Browser binary; auto-detected when `None`
    pub executable: Option<PathBuf>,
    /// Profile directory; a throwaway profile when `None`
    pub user_data_dir: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            extra_args: Vec::new(),
        }
    }
}

/// Launches a local Chromium per session
pub struct ChromiumLauncher {
    config: ChromiumConfig,
}

impl ChromiumLauncher {
    pub fn new(config: ChromiumConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, SessionError> {
        let mut builder = BrowserConfig::builder().disable_default_args();
        builder = if self.config.headless {
            // New headless mode keeps the regular Chrome user agent
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(exe) = &self.config.executable {
            builder = builder.chrome_executable(exe);
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        for arg in launch_args(&self.config) {
            builder = builder.arg(arg);
        }
        builder.build().map_err(SessionError::Launch)
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self) -> Result<ChromiumSession, SessionError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(SessionError::Launch(e.to_string()));
            }
        };

        info!(headless = self.config.headless, "Browser launched");

        Ok(ChromiumSession {
            browser,
            page,
            handler_task,
            closed: false,
        })
    }
}

/// A launched Chromium with a single working tab
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: bool,
}

/// Result shape of the region query script
#[derive(Debug, Deserialize)]
struct RegionQuery {
    found: bool,
    #[serde(default)]
    text: String,
}

impl ChromiumSession {
    async fn add_init_script(&self, source: &str) -> Result<(), SessionError> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        Ok(())
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        expression: String,
    ) -> Result<T, SessionError> {
        let mut params = EvaluateParams::new(expression);
        params.return_by_value = Some(true);
        self.page
            .evaluate_expression(params)
            .await
            .map_err(|e| SessionError::Evaluation(e.to_string()))?
            .into_value()
            .map_err(|e| SessionError::Evaluation(e.to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn restore_auth_state(&mut self, state: &AuthState) -> Result<(), SessionError> {
        let cookies: Vec<CookieParam> = state.cookies.iter().map(cookie_param).collect();
        if !cookies.is_empty() {
            self.page
                .set_cookies(cookies)
                .await
                .map_err(|e| SessionError::Command(e.to_string()))?;
        }
        if let Some(script) = state.local_storage_script() {
            self.add_init_script(&script).await?;
        }
        Ok(())
    }

    async fn apply_stealth(&mut self) -> Result<(), SessionError> {
        self.add_init_script(STEALTH_SCRIPT).await
    }

    /// Resolves on `DOMContentLoaded`, not on the full `load` event
    async fn navigate(&mut self, url: &Url) -> Result<(), SessionError> {
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;

        let response = self
            .page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        if let Some(error_text) = response.result.error_text.clone() {
            return Err(SessionError::Command(error_text));
        }

        match dom_ready.next().await {
            Some(_) => Ok(()),
            None => Err(SessionError::Command(
                "page closed before DOMContentLoaded".to_string(),
            )),
        }
    }

    async fn region_text(&mut self, selector: &str) -> Result<Option<String>, SessionError> {
        let selector = serde_json::to_string(selector)
            .map_err(|e| SessionError::Evaluation(e.to_string()))?;
        let query: RegionQuery = self
            .evaluate(format!(
                "(() => {{ const el = document.querySelector({selector}); \
                 return el ? {{ found: true, text: el.innerText || '' }} : {{ found: false }}; }})()"
            ))
            .await?;
        Ok(query.found.then_some(query.text))
    }

    async fn body_text(&mut self) -> Result<String, SessionError> {
        self.evaluate("document.body ? document.body.innerText : ''".to_string())
            .await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("Browser session closed");

        result
            .map(|_| ())
            .map_err(|e| SessionError::Command(e.to_string()))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Browser's own drop kills the child process; the handler task is ours
        if !self.closed {
            self.handler_task.abort();
        }
    }
}

fn cookie_param(cookie: &StoredCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    if !cookie.is_session_cookie() {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param.same_site = cookie.same_site.map(|same_site| match same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    });
    param
}

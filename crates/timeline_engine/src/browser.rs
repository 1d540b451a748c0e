use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use thiserror::Error;

use crate::cookies::{CookieRecord, SameSite};
use crate::target::{is_login_url, FetchTarget};
use crate::types::{FailureKind, FetchError};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script failed: {0}")]
    Script(String),
    #[error("cookie rejected: {0}")]
    Cookie(String),
    #[error("browser transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// When set, connect to an already-running Chrome debug endpoint
    /// instead of launching a local browser.
    pub remote_debug_url: Option<String>,
    pub chrome_binary: Option<PathBuf>,
    pub nav_timeout: Duration,
    pub presence_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            remote_debug_url: None,
            chrome_binary: None,
            nav_timeout: Duration::from_secs(30),
            presence_timeout: Duration::from_secs(20),
        }
    }
}

/// The declared fingerprint the session presents: user agent, Chrome
/// arguments, and the navigator-webdriver override applied before any
/// platform navigation.
#[derive(Debug, Clone)]
pub struct AntiDetectionProfile {
    pub user_agent: String,
    pub chrome_args: Vec<String>,
    pub init_script: String,
}

impl Default for AntiDetectionProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            chrome_args: [
                "--disable-blink-features=AutomationControlled",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--window-size=1920,1080",
                "--disable-notifications",
                "--disable-popup-blocking",
            ]
            .iter()
            .map(|arg| arg.to_string())
            .collect(),
            init_script:
                "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})"
                    .to_string(),
        }
    }
}

/// Everything the fetch flow needs from a live page. `CdpPage` implements
/// this over chromiumoxide; tests drive the flow with fakes.
#[async_trait]
pub trait TimelinePage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;
    async fn reload(&self) -> Result<(), PageError>;
    async fn current_url(&self) -> Result<String, PageError>;
    async fn inject_cookie(&self, cookie: &CookieRecord) -> Result<(), PageError>;
    /// Polls until any of `selectors` matches or the timeout passes.
    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration)
        -> Result<bool, PageError>;
    /// Scroll height of the document body, the growth proxy for pagination.
    async fn content_extent(&self) -> Result<u64, PageError>;
    async fn scroll_to_bottom(&self) -> Result<(), PageError>;
    async fn run_script(&self, script: &str) -> Result<(), PageError>;
    async fn html(&self) -> Result<String, PageError>;
}

pub struct CdpPage {
    page: Page,
}

#[async_trait]
impl TimelinePage for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.page
            .goto(url)
            .await
            .map_err(|err| PageError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        self.page
            .reload()
            .await
            .map_err(|err| PageError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| PageError::Transport(err.to_string()))?;
        Ok(url.map(|u| u.to_string()).unwrap_or_default())
    }

    async fn inject_cookie(&self, cookie: &CookieRecord) -> Result<(), PageError> {
        let same_site = match cookie.same_site {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        };
        let mut builder = CookieParam::builder()
            .name(&cookie.name)
            .value(&cookie.value)
            .domain(&cookie.domain)
            .path(&cookie.path)
            .same_site(same_site);
        if let Some(expiry) = cookie.expiry {
            builder = builder.expires(TimeSinceEpoch::new(expiry as f64));
        }
        let param = builder
            .build()
            .map_err(|err| PageError::Cookie(err.to_string()))?;
        self.page
            .set_cookie(param)
            .await
            .map_err(|err| PageError::Cookie(err.to_string()))?;
        Ok(())
    }

    async fn wait_for_any(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<bool, PageError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            for css in selectors {
                if self.page.find_element(*css).await.is_ok() {
                    return Ok(true);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    async fn content_extent(&self) -> Result<u64, PageError> {
        let height: f64 = self
            .page
            .evaluate("document.body.scrollHeight".to_string())
            .await
            .map_err(|err| PageError::Script(err.to_string()))?
            .into_value()
            .map_err(|err| PageError::Script(err.to_string()))?;
        Ok(height as u64)
    }

    async fn scroll_to_bottom(&self) -> Result<(), PageError> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight);")
            .await
    }

    async fn run_script(&self, script: &str) -> Result<(), PageError> {
        self.page
            .evaluate(script.to_string())
            .await
            .map_err(|err| PageError::Script(err.to_string()))?;
        Ok(())
    }

    async fn html(&self) -> Result<String, PageError> {
        self.page
            .content()
            .await
            .map_err(|err| PageError::Transport(err.to_string()))
    }
}

/// One exclusively-owned browser with a single page. The orchestrator is
/// responsible for calling `close` on every exit path.
pub struct BrowserSession {
    browser: Browser,
    page: CdpPage,
}

impl BrowserSession {
    pub async fn open(
        settings: &BrowserSettings,
        profile: &AntiDetectionProfile,
    ) -> Result<Self, FetchError> {
        let browser = match settings.remote_debug_url.as_deref() {
            Some(remote) => connect_remote(remote).await?,
            None => launch_local(settings, profile).await?,
        };

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await
            .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?;
        if let Err(err) = page.evaluate(profile.init_script.clone()).await {
            engine_debug!("init script skipped: {}", err);
        }

        Ok(Self {
            browser,
            page: CdpPage { page },
        })
    }

    pub fn page(&self) -> &CdpPage {
        &self.page
    }

    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            engine_warn!("browser close failed: {}", err);
        }
        let _ = self.browser.wait().await;
    }
}

async fn launch_local(
    settings: &BrowserSettings,
    profile: &AntiDetectionProfile,
) -> Result<Browser, FetchError> {
    let executable = match &settings.chrome_binary {
        Some(path) => path.clone(),
        None => find_chrome()
            .ok_or_else(|| FetchError::new(FailureKind::BrowserLaunch, "chromium not found"))?,
    };
    engine_info!("launching browser at {:?} (headless={})", executable, settings.headless);

    let mut builder = BrowserConfig::builder().chrome_executable(executable);
    if !settings.headless {
        builder = builder.with_head();
    }
    for arg in &profile.chrome_args {
        builder = builder.arg(arg);
    }
    let config = builder
        .build()
        .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?;
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });
    Ok(browser)
}

async fn connect_remote(url: &str) -> Result<Browser, FetchError> {
    let ws_url = discover_websocket(url).await?;
    engine_info!("connecting to remote browser at {}", ws_url);
    let (browser, mut handler) = Browser::connect(&ws_url)
        .await
        .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?;
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });
    Ok(browser)
}

/// Resolves the websocket debugger URL behind a Chrome debug endpoint via
/// its `/json/version` route.
pub async fn discover_websocket(url: &str) -> Result<String, FetchError> {
    let http_url = url.replace("ws://", "http://").replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let client = reqwest::Client::new();
    let response: serde_json::Value = client
        .get(&version_url)
        .send()
        .await
        .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?
        .json()
        .await
        .map_err(|err| FetchError::new(FailureKind::BrowserLaunch, err.to_string()))?;

    response
        .get("webSocketDebuggerUrl")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            FetchError::new(
                FailureKind::BrowserLaunch,
                "no webSocketDebuggerUrl in version response",
            )
        })
}

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

fn find_chrome() -> Option<PathBuf> {
    for path in CHROME_PATHS {
        let candidate = Path::new(path);
        if candidate.exists() {
            return Some(candidate.to_path_buf());
        }
    }
    for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated,
    Unauthenticated { url: String },
}

/// Establishes the session: navigate to the platform root (cookies can only
/// be set for a visited domain), inject every cookie, reload, then classify
/// the resulting URL. Individually rejected cookies are logged and skipped;
/// whether the survivors suffice is decided by the post-reload URL.
pub async fn authenticate<P>(
    page: &P,
    target: &FetchTarget,
    cookies: &[CookieRecord],
    settle: Duration,
) -> Result<AuthResult, PageError>
where
    P: TimelinePage + ?Sized,
{
    page.navigate(target.root_url()).await?;
    tokio::time::sleep(settle).await;

    let mut injected = 0usize;
    for cookie in cookies {
        match page.inject_cookie(cookie).await {
            Ok(()) => injected += 1,
            Err(err) => engine_warn!("cookie {} rejected: {}", cookie.name, err),
        }
    }
    engine_info!("injected {}/{} cookies", injected, cookies.len());

    page.reload().await?;
    tokio::time::sleep(settle).await;

    let url = page.current_url().await?;
    if is_login_url(&url) {
        Ok(AuthResult::Unauthenticated { url })
    } else {
        Ok(AuthResult::Authenticated)
    }
}

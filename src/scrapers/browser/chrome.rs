//! Headless Chrome renderer.
//!
//! Every request gets its own browser (or its own tab on a remote DevTools
//! endpoint), which is torn down when the page is closed.

#[cfg(feature = "browser")]
use std::path::{Path, PathBuf};
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::config::BrowserEngineConfig;
use super::page::{PageRenderer, RenderedPage};
#[cfg(feature = "browser")]
use super::types::ElementSnapshot;
use super::types::RenderError;

/// Script returning `innerText` of the body.
#[cfg(feature = "browser")]
const PAGE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// Renderer that drives Chrome through the DevTools protocol.
pub struct ChromeRenderer {
    config: BrowserEngineConfig,
}

impl ChromeRenderer {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self) -> Result<Box<dyn RenderedPage>, RenderError> {
        let session = match self.config.remote_url.clone() {
            Some(url) => ChromeSession::connect_remote(&self.config, &url).await?,
            None => ChromeSession::launch(&self.config).await?,
        };
        Ok(Box::new(session))
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self) -> Result<Box<dyn RenderedPage>, RenderError> {
        let _ = &self.config;
        Err(RenderError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

/// Temporary Chrome user data directory, removed when dropped.
///
/// Dropping also covers a launch that is cancelled or fails before a
/// session exists to close.
#[cfg(feature = "browser")]
struct ProfileDir(PathBuf);

#[cfg(feature = "browser")]
impl ProfileDir {
    fn new_in(base: &Path) -> Self {
        Self(base.join(format!("gdscrape-profile-{}", uuid::Uuid::new_v4())))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(feature = "browser")]
impl Drop for ProfileDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.0) {
            Ok(()) => debug!("Removed browser profile {:?}", self.0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove browser profile {:?}: {}", self.0, e),
        }
    }
}

/// One request's browser and tab.
#[cfg(feature = "browser")]
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    /// Launched locally (we own the process) vs. attached to a remote browser.
    owns_process: bool,
    profile_dir: Option<ProfileDir>,
    closed: bool,
}

#[cfg(feature = "browser")]
impl ChromeSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Find a Chrome executable: explicit path, well-known locations, then PATH.
    fn find_chrome(config: &BrowserEngineConfig) -> Result<PathBuf, RenderError> {
        if let Some(ref path) = config.chrome_path {
            if path.exists() {
                return Ok(path.clone());
            }
            warn!("Configured Chrome path {:?} does not exist", path);
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(RenderError::Launch(
            "Chrome/Chromium not found. Install chromium or set CHROME_PATH".to_string(),
        ))
    }

    /// Launch a dedicated headless Chrome for one request.
    async fn launch(config: &BrowserEngineConfig) -> Result<Self, RenderError> {
        let chrome_path = Self::find_chrome(config)?;
        let profile_dir = ProfileDir::new_in(&std::env::temp_dir());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile_dir.path());

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder.build().map_err(RenderError::Launch)?;

        debug!("Launching browser (headless={})", config.headless);
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Self::with_page(browser, handler, true, Some(profile_dir), config).await
    }

    /// Attach to a remote Chrome and open a fresh tab.
    async fn connect_remote(config: &BrowserEngineConfig, url: &str) -> Result<Self, RenderError> {
        info!("Connecting to remote browser at {}", url);

        // Resolve the WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await?
            .json()
            .await?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RenderError::Launch("No webSocketDebuggerUrl in response".into()))?;

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Self::with_page(browser, handler, false, None, config).await
    }

    async fn with_page(
        browser: Browser,
        handler: JoinHandle<()>,
        owns_process: bool,
        profile_dir: Option<ProfileDir>,
        config: &BrowserEngineConfig,
    ) -> Result<Self, RenderError> {
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut session_browser = browser;
                if owns_process {
                    let _ = session_browser.close().await;
                    let _ = session_browser.wait().await;
                }
                handler.abort();
                drop(profile_dir);
                return Err(RenderError::Browser(e.to_string()));
            }
        };

        let mut session = Self {
            browser: Mutex::new(browser),
            page,
            handler,
            owns_process,
            profile_dir,
            closed: false,
        };

        // Set user agent before any navigation
        if let Err(e) = session
            .page
            .execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await
        {
            session.close().await;
            return Err(RenderError::Browser(e.to_string()));
        }

        Ok(session)
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        script: String,
    ) -> Result<T, RenderError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?
            .into_value()
            .map_err(|e| RenderError::Browser(format!("Unexpected script result: {}", e)))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderedPage for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Browser(e.to_string())),
            Err(_) => Err(RenderError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        let selector_literal = serde_json::to_string(selector)
            .map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
        let script = format!(
            r#"Array.from(document.querySelectorAll({})).map((e) => ({{
                text: (e.innerText || e.textContent || '').replace(/\s+/g, ' ').trim(),
                href: e.href || e.getAttribute('href') || null
            }}))"#,
            selector_literal
        );
        self.evaluate(script).await
    }

    async fn page_text(&self) -> Result<String, RenderError> {
        self.evaluate(PAGE_TEXT_SCRIPT.to_string()).await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            debug!("Page close failed: {}", e);
        }

        let browser = self.browser.get_mut();
        if self.owns_process {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
        }
        self.handler.abort();

        // Chrome has exited, so the profile can go
        drop(self.profile_dir.take());
    }
}

#[cfg(all(test, feature = "browser"))]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dir_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let profile = ProfileDir::new_in(base.path());
        let path = profile.path().to_path_buf();
        std::fs::create_dir_all(path.join("Default")).unwrap();
        std::fs::write(path.join("Default").join("Preferences"), "{}").unwrap();

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_profile_dir_is_fine() {
        let base = tempfile::tempdir().unwrap();
        let profile = ProfileDir::new_in(base.path());
        assert!(profile
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("gdscrape-profile-"));
        drop(profile);
        assert!(base.path().exists());
    }

    #[tokio::test]
    async fn test_cancelled_launch_removes_profile() {
        let base = tempfile::tempdir().unwrap();
        let profile = ProfileDir::new_in(base.path());
        let path = profile.path().to_path_buf();
        std::fs::create_dir_all(&path).unwrap();

        // Stands in for a launch still holding its profile when the open timeout fires
        let launch = async move {
            let _profile = profile;
            std::future::pending::<()>().await
        };
        assert!(tokio::time::timeout(Duration::from_millis(20), launch)
            .await
            .is_err());
        assert!(!path.exists());
    }
}

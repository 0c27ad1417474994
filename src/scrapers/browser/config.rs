//! Renderer configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default desktop user agent presented to file hosts.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Which renderer backs each request.
    #[serde(default)]
    pub engine: RendererKind,

    /// Run in headless mode (default: true).
    /// Set to false for debugging selector drift against a live page.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Explicit Chrome/Chromium executable.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, each request opens a tab there instead of launching Chrome.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// User agent override.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            engine: RendererKind::default(),
            headless: default_headless(),
            proxy: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: default_user_agent(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply `BROWSER_URL`, `CHROME_PATH` and `GDSCRAPE_RENDERER` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = std::env::var("BROWSER_URL").ok().filter(|s| !s.is_empty()) {
            self.remote_url = Some(url);
        }
        if let Some(path) = std::env::var("CHROME_PATH").ok().filter(|s| !s.is_empty()) {
            self.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(kind) = std::env::var("GDSCRAPE_RENDERER")
            .ok()
            .and_then(|s| RendererKind::from_str(&s))
        {
            self.engine = kind;
        }
        self
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Renderer backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Headless Chrome via chromiumoxide (default); runs page JavaScript.
    #[default]
    Chrome,

    /// Plain HTTP fetch without JavaScript; only works for pre-rendered mirrors.
    Http,
}

impl RendererKind {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "browser" | "chromium" => Some(RendererKind::Chrome),
            "http" | "static" => Some(RendererKind::Http),
            _ => None,
        }
    }
}

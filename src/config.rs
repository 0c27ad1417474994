//! Configuration management for gdscrape using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::rate_limit::{default_max_requests_per_minute, RateLimitConfig};
use crate::scrapers::browser::{BrowserEngineConfig, ReadyCondition};
use crate::scrapers::classify::{default_noise_keywords, default_rules, CategoryRule};
use crate::scrapers::extract::default_name_selectors;
use crate::scrapers::orchestrator::ReadyWaitPolicy;

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 3030;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Interface the server binds to.
    pub host: String,
    /// Port the server binds to.
    pub port: u16,
    /// Substrings one of which must appear in the target URL's host.
    pub allowed_domains: Vec<String>,
    /// Requests per client per minute (0 disables limiting).
    pub rate_limit_per_minute: u32,
    /// Navigation bound in seconds.
    pub navigation_timeout_secs: u64,
    /// Readiness wait bound in seconds.
    pub ready_timeout_secs: u64,
    /// Extraction allowance on top of navigation and readiness, in seconds.
    pub extraction_grace_secs: u64,
    pub ready_condition: ReadyCondition,
    pub ready_wait: ReadyWaitPolicy,
    /// Selector used to enumerate candidate download anchors.
    pub link_selector: String,
    pub noise_keywords: Vec<String>,
    pub name_selectors: Vec<String>,
    pub category_rules: Vec<CategoryRule>,
    /// Take the client identity from `X-Forwarded-For` (only behind a trusted proxy).
    pub trust_forwarded: bool,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_domains: vec!["gdflix".to_string()],
            rate_limit_per_minute: default_max_requests_per_minute(),
            navigation_timeout_secs: 30,
            ready_timeout_secs: 15,
            extraction_grace_secs: 10,
            ready_condition: ReadyCondition::default(),
            ready_wait: ReadyWaitPolicy::default(),
            link_selector: "a".to_string(),
            noise_keywords: default_noise_keywords(),
            name_selectors: default_name_selectors(),
            category_rules: default_rules(),
            trust_forwarded: false,
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests_per_minute: self.rate_limit_per_minute,
            ..Default::default()
        }
    }

    /// `host:port` the server listens on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    /// Requests per client per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    /// Navigation timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timeout: Option<u64>,
    /// Readiness wait timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_timeout: Option<u64>,
    /// Extraction grace in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_grace: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_condition: Option<ReadyCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_wait: Option<ReadyWaitPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_selectors: Option<Vec<String>>,
    /// Ordered classification table; replaces the built-in one entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_rules: Option<Vec<CategoryRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_forwarded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers gdscrape config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("gdscrape").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(ref domains) = self.allowed_domains {
            settings.allowed_domains = domains.clone();
        }
        if let Some(limit) = self.rate_limit {
            settings.rate_limit_per_minute = limit;
        }
        if let Some(secs) = self.navigation_timeout {
            settings.navigation_timeout_secs = secs;
        }
        if let Some(secs) = self.ready_timeout {
            settings.ready_timeout_secs = secs;
        }
        if let Some(secs) = self.extraction_grace {
            settings.extraction_grace_secs = secs;
        }
        if let Some(ref condition) = self.ready_condition {
            settings.ready_condition = condition.clone();
        }
        if let Some(policy) = self.ready_wait {
            settings.ready_wait = policy;
        }
        if let Some(ref selector) = self.link_selector {
            settings.link_selector = selector.clone();
        }
        if let Some(ref keywords) = self.noise_keywords {
            settings.noise_keywords = keywords.clone();
        }
        if let Some(ref selectors) = self.name_selectors {
            settings.name_selectors = selectors.clone();
        }
        if let Some(ref rules) = self.category_rules {
            settings.category_rules = rules.clone();
        }
        if let Some(trust) = self.trust_forwarded {
            settings.trust_forwarded = trust;
        }
        if let Some(ref browser) = self.browser {
            let mut browser = browser.clone();
            browser.chrome_path = browser
                .chrome_path
                .map(|p| self.resolve_path(&p.to_string_lossy(), base_dir));
            settings.browser = browser;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load config from the explicit path, or discover it.
async fn load_file_config(options: &LoadOptions) -> Config {
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            });
    }

    Config::load().await
}

/// Split a comma separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("1") || value.eq_ignore_ascii_case("true")
}

/// Apply environment overrides read through `lookup`.
fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

    if let Some(host) = var("HOST") {
        tracing::debug!("Using HOST from environment: {}", host);
        settings.host = host;
    }
    if let Some(port) = var("PORT") {
        match port.trim().parse() {
            Ok(port) => settings.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT: {}", port),
        }
    }
    if let Some(domains) = var("GDSCRAPE_ALLOWED_DOMAINS") {
        tracing::debug!("Using GDSCRAPE_ALLOWED_DOMAINS from environment: {}", domains);
        settings.allowed_domains = parse_list(&domains);
    }
    if let Some(limit) = var("GDSCRAPE_RATE_LIMIT") {
        match limit.trim().parse() {
            Ok(limit) => settings.rate_limit_per_minute = limit,
            Err(_) => tracing::warn!("Ignoring invalid GDSCRAPE_RATE_LIMIT: {}", limit),
        }
    }
    if let Some(secs) = var("GDSCRAPE_NAVIGATION_TIMEOUT") {
        match secs.trim().parse() {
            Ok(secs) => settings.navigation_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid GDSCRAPE_NAVIGATION_TIMEOUT: {}", secs),
        }
    }
    if let Some(secs) = var("GDSCRAPE_READY_TIMEOUT") {
        match secs.trim().parse() {
            Ok(secs) => settings.ready_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid GDSCRAPE_READY_TIMEOUT: {}", secs),
        }
    }
    if let Some(keywords) = var("GDSCRAPE_NOISE_KEYWORDS") {
        settings.noise_keywords = parse_list(&keywords);
    }
    if let Some(policy) = var("GDSCRAPE_READY_WAIT") {
        match ReadyWaitPolicy::from_str(&policy) {
            Some(policy) => settings.ready_wait = policy,
            None => tracing::warn!("Ignoring invalid GDSCRAPE_READY_WAIT: {}", policy),
        }
    }
    if let Some(trust) = var("GDSCRAPE_TRUST_FORWARDED") {
        settings.trust_forwarded = is_truthy(trust.trim());
    }
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;
    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    // Environment takes precedence over the file
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.browser = settings.browser.with_env_overrides();

    (settings, config)
}

//! Per-request scrape pipeline.
//!
//! Acquire a page, navigate, wait for client-side rendering, extract and
//! classify, then release the page no matter how the earlier steps ended.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::browser::{PageRenderer, ReadyCondition, RenderError, RenderedPage};
use super::classify::LinkClassifier;
use super::extract::MetadataExtractor;
use crate::config::Settings;
use crate::error::ScrapeError;
use crate::models::{DownloadLink, FileMetadata, ScrapeRequest, ScrapeResult};

/// What to do when the readiness condition is not met in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyWaitPolicy {
    /// Log a warning and extract whatever has rendered.
    #[default]
    BestEffort,
    /// Fail the request with a timeout.
    Strict,
}

impl ReadyWaitPolicy {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" | "lenient" => Some(Self::BestEffort),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Pipeline stages, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapePhase {
    Acquiring,
    Navigating,
    WaitingReady,
    Extracting,
    Releasing,
}

impl fmt::Display for ScrapePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapePhase::Acquiring => "acquiring",
            ScrapePhase::Navigating => "navigating",
            ScrapePhase::WaitingReady => "waiting_ready",
            ScrapePhase::Extracting => "extracting",
            ScrapePhase::Releasing => "releasing",
        };
        f.write_str(name)
    }
}

/// Timeouts and selectors for one pipeline run.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub navigation_timeout: Duration,
    pub ready_timeout: Duration,
    /// Extra time allowed for extraction on top of navigation and readiness.
    pub extraction_grace: Duration,
    pub ready_condition: ReadyCondition,
    pub ready_wait: ReadyWaitPolicy,
    /// Selector enumerating candidate download anchors.
    pub link_selector: String,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(15),
            extraction_grace: Duration::from_secs(10),
            ready_condition: ReadyCondition::default(),
            ready_wait: ReadyWaitPolicy::default(),
            link_selector: "a".to_string(),
        }
    }
}

impl ScrapeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            ready_timeout: Duration::from_secs(settings.ready_timeout_secs),
            extraction_grace: Duration::from_secs(settings.extraction_grace_secs),
            ready_condition: settings.ready_condition.clone(),
            ready_wait: settings.ready_wait,
            link_selector: settings.link_selector.clone(),
        }
    }

    /// Upper bound on navigation, readiness and extraction together.
    pub fn overall_timeout(&self) -> Duration {
        self.navigation_timeout + self.ready_timeout + self.extraction_grace
    }
}

/// Runs the scrape pipeline against a fresh page per request.
pub struct Orchestrator {
    renderer: Arc<dyn PageRenderer>,
    extractor: MetadataExtractor,
    classifier: LinkClassifier,
    options: ScrapeOptions,
}

impl Orchestrator {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        extractor: MetadataExtractor,
        classifier: LinkClassifier,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            renderer,
            extractor,
            classifier,
            options,
        }
    }

    pub fn from_settings(settings: &Settings, renderer: Arc<dyn PageRenderer>) -> Self {
        Self::new(
            renderer,
            MetadataExtractor::new(settings.name_selectors.clone()),
            LinkClassifier::new(
                settings.noise_keywords.clone(),
                settings.category_rules.clone(),
            ),
            ScrapeOptions::from_settings(settings),
        )
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Scrape one validated request.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let started = Instant::now();
        let url = request.target_url.as_str();

        debug!(phase = %ScrapePhase::Acquiring, "Opening {} page", self.renderer.name());
        let mut page = match tokio::time::timeout(
            self.options.navigation_timeout,
            self.renderer.open(),
        )
        .await
        {
            Ok(page) => page?,
            Err(_) => {
                return Err(ScrapeError::Timeout(format!(
                    "Browser did not start within {}s",
                    self.options.navigation_timeout.as_secs()
                )))
            }
        };

        let overall = self.options.overall_timeout();
        let outcome = tokio::time::timeout(overall, self.drive(page.as_mut(), url)).await;

        debug!(phase = %ScrapePhase::Releasing, "Closing page");
        page.close().await;

        let (metadata, downloads) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScrapeError::Timeout(format!(
                    "Scrape of {} exceeded {}s",
                    url,
                    overall.as_secs()
                )))
            }
        };

        if downloads.is_empty() {
            return Err(ScrapeError::ExtractionFailed(
                "No download links found on page".to_string(),
            ));
        }

        let elapsed = started.elapsed().as_secs_f64();
        info!(
            "Scraped {} ({} links) in {:.2}s",
            metadata.file_name,
            downloads.len(),
            elapsed
        );
        Ok(ScrapeResult::new(metadata, downloads, elapsed))
    }

    async fn drive(
        &self,
        page: &mut dyn RenderedPage,
        url: &str,
    ) -> Result<(FileMetadata, Vec<DownloadLink>), ScrapeError> {
        debug!(phase = %ScrapePhase::Navigating, "Navigating to {}", url);
        page.navigate(url, self.options.navigation_timeout).await?;

        debug!(phase = %ScrapePhase::WaitingReady, "Waiting for rendered links");
        match page
            .wait_until(&self.options.ready_condition, self.options.ready_timeout)
            .await
        {
            Ok(()) => {}
            Err(RenderError::ReadyTimeout(timeout))
                if self.options.ready_wait == ReadyWaitPolicy::BestEffort =>
            {
                warn!(
                    "Page not ready after {}s, extracting what has rendered",
                    timeout.as_secs()
                );
            }
            Err(e) => return Err(e.into()),
        }

        debug!(phase = %ScrapePhase::Extracting, "Extracting metadata and links");
        let metadata = self.extractor.extract(&*page).await;
        let anchors = page.query_all(&self.options.link_selector).await?;
        let downloads = self.classifier.classify(&anchors);
        debug!("{} of {} anchors classified", downloads.len(), anchors.len());

        Ok((metadata, downloads))
    }
}

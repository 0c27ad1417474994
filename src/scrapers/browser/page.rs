//! Renderer capability traits and the in-memory HTML page.
//!
//! The extraction pipeline only talks to [`RenderedPage`]; Chrome, plain HTTP
//! and test fixtures all sit behind it.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::types::{ElementSnapshot, RenderError};

/// Interval between readiness polls.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// DOM state used as the signal that client-side rendering has finished.
///
/// Met when any element matching `selector` has text containing one of
/// `text_contains` (case-insensitive). An empty `text_contains` means mere
/// presence of a matching element is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyCondition {
    #[serde(default = "default_ready_selector")]
    pub selector: String,
    #[serde(default = "default_ready_text")]
    pub text_contains: Vec<String>,
}

impl Default for ReadyCondition {
    fn default() -> Self {
        Self {
            selector: default_ready_selector(),
            text_contains: default_ready_text(),
        }
    }
}

fn default_ready_selector() -> String {
    "a".to_string()
}

fn default_ready_text() -> Vec<String> {
    vec!["instant".to_string(), "download".to_string()]
}

impl ReadyCondition {
    pub fn is_met(&self, elements: &[ElementSnapshot]) -> bool {
        if self.text_contains.is_empty() {
            return !elements.is_empty();
        }
        elements.iter().any(|el| {
            let text = el.text.to_lowercase();
            self.text_contains
                .iter()
                .any(|needle| text.contains(&needle.to_lowercase()))
        })
    }
}

/// A loaded document owned by exactly one request.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// Load `url`, giving up after `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Snapshot every element matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError>;

    /// Full visible text of the document body.
    async fn page_text(&self) -> Result<String, RenderError>;

    /// Release the underlying session. Must be safe to call more than once.
    async fn close(&mut self);

    async fn query_one(&self, selector: &str) -> Result<Option<ElementSnapshot>, RenderError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    /// Poll until `condition` holds, or fail with [`RenderError::ReadyTimeout`].
    async fn wait_until(
        &self,
        condition: &ReadyCondition,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let poll = async {
            loop {
                match self.query_all(&condition.selector).await {
                    Ok(elements) if condition.is_met(&elements) => return,
                    Ok(_) => {}
                    // Queries can fail while the page is still swapping documents
                    Err(e) => debug!("Readiness poll failed: {}", e),
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| RenderError::ReadyTimeout(timeout))
    }
}

/// Produces a fresh page session per request.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Acquire a new, unshared page session.
    async fn open(&self) -> Result<Box<dyn RenderedPage>, RenderError>;

    /// Renderer name for logs.
    fn name(&self) -> &'static str;
}

/// Page backed by a static HTML string parsed with `scraper`.
///
/// Navigation is a no-op; the document is whatever was supplied. Used for
/// fixtures and as the document store of the HTTP renderer.
///
/// With a base URL set, `href` values are resolved against it the way a
/// browser reports `element.href`.
#[derive(Debug, Clone, Default)]
pub struct HtmlPage {
    html: String,
    base_url: Option<Url>,
}

impl HtmlPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Replace the document and the URL it was served from.
    pub fn load(&mut self, html: String, base_url: Url) {
        self.html = html;
        self.base_url = Some(base_url);
    }

    fn resolve_href(&self, raw: &str) -> String {
        let raw = raw.trim();
        match self.base_url.as_ref().map(|base| base.join(raw)) {
            Some(Ok(resolved)) => resolved.to_string(),
            _ => raw.to_string(),
        }
    }

    pub fn select(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        let parsed = Selector::parse(selector)
            .map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
        let doc = Html::parse_document(&self.html);

        Ok(doc
            .select(&parsed)
            .map(|el| ElementSnapshot {
                text: collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")),
                href: el.value().attr("href").map(|h| self.resolve_href(h)),
            })
            .collect())
    }

    /// Text nodes outside of script/style/head content, joined by spaces.
    pub fn visible_text(&self) -> String {
        let doc = Html::parse_document(&self.html);
        let mut parts: Vec<&str> = Vec::new();

        for node in doc.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| {
                    matches!(name, "script" | "style" | "noscript" | "template" | "title")
                });
            let trimmed = text.trim();
            if !hidden && !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }

        collapse_whitespace(&parts.join(" "))
    }
}

#[async_trait]
impl RenderedPage for HtmlPage {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), RenderError> {
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        self.select(selector)
    }

    async fn page_text(&self) -> Result<String, RenderError> {
        Ok(self.visible_text())
    }

    async fn close(&mut self) {}
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html>
          <head><title>GDFlix | movie.mkv</title><script>var x = "9 GB";</script></head>
          <body>
            <h3>  movie.mkv </h3>
            <ul><li class="list-group-item">Size : 700 MB</li></ul>
            <a class="btn" href="https://instant.example/a"><i></i> Instant
               Download</a>
            <a class="btn">No href</a>
          </body>
        </html>
    "#;

    #[tokio::test]
    async fn test_query_all_collapses_text() {
        let page = HtmlPage::new(FIXTURE);
        let links = page.query_all("a.btn").await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Instant Download");
        assert_eq!(links[0].href.as_deref(), Some("https://instant.example/a"));
        assert_eq!(links[1].href, None);
    }

    #[tokio::test]
    async fn test_query_one_returns_first_match() {
        let page = HtmlPage::new(FIXTURE);
        let heading = page.query_one("h3").await.unwrap().unwrap();
        assert_eq!(heading.text, "movie.mkv");
        assert!(page.query_one("h1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let page = HtmlPage::new(FIXTURE);
        let err = page.query_all("a[").await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn test_relative_hrefs_resolve_against_base() {
        let base = Url::parse("https://new.gdflix.dad/file/abc").unwrap();
        let page = HtmlPage::new(
            r#"<a href="/dl/1">Instant DL</a>
               <a href="mirror/2">GoFile</a>
               <a href=" https://t.me/bot?start=1 ">Bot</a>"#,
        )
        .with_base_url(base);

        let hrefs: Vec<String> = page
            .query_all("a")
            .await
            .unwrap()
            .into_iter()
            .filter_map(|el| el.href)
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "https://new.gdflix.dad/dl/1",
                "https://new.gdflix.dad/file/mirror/2",
                "https://t.me/bot?start=1",
            ]
        );
    }

    #[tokio::test]
    async fn test_hrefs_kept_raw_without_base() {
        let page = HtmlPage::new(r#"<a href=" /dl/1 ">Instant DL</a>"#);
        let link = page.query_one("a").await.unwrap().unwrap();
        assert_eq!(link.href.as_deref(), Some("/dl/1"));
    }

    #[test]
    fn test_visible_text_skips_scripts_and_title() {
        let text = HtmlPage::new(FIXTURE).visible_text();
        assert!(text.contains("Size : 700 MB"));
        assert!(!text.contains("9 GB"));
        assert!(!text.contains("GDFlix |"));
    }

    #[test]
    fn test_ready_condition() {
        let condition = ReadyCondition::default();
        assert!(condition.is_met(&[ElementSnapshot::link("Instant DL", "#")]));
        assert!(!condition.is_met(&[ElementSnapshot::link("Login", "/login")]));

        let presence = ReadyCondition {
            selector: "a.btn".into(),
            text_contains: vec![],
        };
        assert!(presence.is_met(&[ElementSnapshot::default()]));
        assert!(!presence.is_met(&[]));
    }

    #[tokio::test]
    async fn test_wait_until_met_immediately() {
        let page = HtmlPage::new(FIXTURE);
        page.wait_until(&ReadyCondition::default(), Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let page = HtmlPage::new("<html><body><a href='/login'>Login</a></body></html>");
        let err = page
            .wait_until(&ReadyCondition::default(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::ReadyTimeout(_)));
    }
}

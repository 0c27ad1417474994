//! Plain HTTP renderer (no JavaScript).

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::config::BrowserEngineConfig;
use super::page::{HtmlPage, PageRenderer, RenderedPage};
use super::types::{ElementSnapshot, RenderError};

/// Fetches pages with `reqwest` and parses the served HTML as-is.
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(config: &BrowserEngineConfig) -> Result<Self, RenderError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true);

        // Same as Chrome: only the configured proxy, never the environment's
        builder = match config.proxy {
            Some(ref proxy) => builder.proxy(reqwest::Proxy::all(proxy)?),
            None => builder.no_proxy(),
        };

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self) -> Result<Box<dyn RenderedPage>, RenderError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            document: HtmlPage::default(),
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// One request's fetched document.
pub struct HttpPage {
    client: reqwest::Client,
    document: HtmlPage,
}

impl HttpPage {
    /// Body and final URL (after redirects) of `url`.
    async fn fetch(&self, url: &str) -> Result<(String, Url), RenderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }
        let final_url = response.url().clone();
        Ok((response.text().await?, final_url))
    }
}

#[async_trait]
impl RenderedPage for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        debug!("Fetching {}", url);
        let (html, final_url) = match tokio::time::timeout(timeout, self.fetch(url)).await {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(RenderError::Http(e))) if e.is_timeout() => {
                return Err(RenderError::NavigationTimeout {
                    url: url.to_string(),
                    timeout,
                })
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(RenderError::NavigationTimeout {
                    url: url.to_string(),
                    timeout,
                })
            }
        };
        // Links are resolved against where the page actually came from
        self.document.load(html, final_url);
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        self.document.select(selector)
    }

    async fn page_text(&self) -> Result<String, RenderError> {
        Ok(self.document.visible_text())
    }

    async fn close(&mut self) {}
}

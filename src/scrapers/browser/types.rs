//! Renderer snapshot and error types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Text and link target of one DOM element, captured at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Visible text with whitespace collapsed.
    pub text: String,
    /// `href` of the element, if it has one.
    #[serde(default)]
    pub href: Option<String>,
}

impl ElementSnapshot {
    pub fn new(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            href: href.map(|h| h.to_string()),
        }
    }

    /// Anchor helper used heavily by fixtures.
    pub fn link(text: impl Into<String>, href: &str) -> Self {
        Self::new(text, Some(href))
    }
}

/// Failures raised by a renderer session.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Navigation to {url} timed out after {}s", .timeout.as_secs())]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Page did not become ready within {}s", .0.as_secs())]
    ReadyTimeout(Duration),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Page returned HTTP {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

//! File name and size extraction from a rendered landing page.
//!
//! Both lookups are best-effort: anything not found comes back as
//! [`UNKNOWN`], never as an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::browser::RenderedPage;
use crate::models::{FileMetadata, UNKNOWN};

/// A number followed by a storage unit, e.g. "1.2 GB" or "700MB".
static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+(?:\.\d+)?\s?(?:GB|MB|TB)").unwrap());

/// Selectors tried in order for the file name.
pub fn default_name_selectors() -> Vec<String> {
    [
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        ".file-name",
        ".filename",
        ".file-title",
        ".title",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Reads file metadata from a page.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    name_selectors: Vec<String>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(default_name_selectors())
    }
}

impl MetadataExtractor {
    pub fn new(name_selectors: Vec<String>) -> Self {
        Self { name_selectors }
    }

    pub async fn extract(&self, page: &dyn RenderedPage) -> FileMetadata {
        let file_name = self
            .file_name(page)
            .await
            .unwrap_or_else(|| UNKNOWN.to_string());

        let file_size = match page.page_text().await {
            Ok(text) => file_size_from_text(&text),
            Err(e) => {
                debug!("Could not read page text: {}", e);
                None
            }
        }
        .unwrap_or_else(|| UNKNOWN.to_string());

        FileMetadata {
            file_name,
            file_size,
        }
    }

    /// First non-empty text across the selector list; stops at the first hit.
    async fn file_name(&self, page: &dyn RenderedPage) -> Option<String> {
        for selector in &self.name_selectors {
            let elements = match page.query_all(selector).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Name selector {} failed: {}", selector, e);
                    continue;
                }
            };

            if let Some(name) = elements
                .iter()
                .map(|el| el.text.trim())
                .find(|text| !text.is_empty())
            {
                debug!("File name matched by {}", selector);
                return Some(name.to_string());
            }
        }
        None
    }
}

/// First size-like substring in `text`, as written on the page.
pub fn file_size_from_text(text: &str) -> Option<String> {
    SIZE_PATTERN.find(text).map(|m| m.as_str().to_string())
}

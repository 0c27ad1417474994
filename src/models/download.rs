//! File page metadata and mirror link models.

use serde::{Deserialize, Serialize};
use url::Url;

/// Sentinel used when a field could not be found on the page.
pub const UNKNOWN: &str = "Unknown";

/// A validated inbound scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub target_url: Url,
}

impl ScrapeRequest {
    pub fn new(target_url: Url) -> Self {
        Self { target_url }
    }

    /// Host of the target URL (always present once validated).
    pub fn host(&self) -> &str {
        self.target_url.host_str().unwrap_or_default()
    }
}

/// File name and size read from a landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: String,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            file_name: UNKNOWN.to_string(),
            file_size: UNKNOWN.to_string(),
        }
    }
}

/// A single mirror endpoint offered on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    /// Canonical category name, or the raw button text for generic download buttons.
    pub server: String,
    pub url: String,
    pub button_text: String,
}

/// Assembled result of one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub file_name: String,
    pub file_size: String,
    /// Links in document order.
    pub downloads: Vec<DownloadLink>,
    pub elapsed_seconds: f64,
}

impl ScrapeResult {
    pub fn new(metadata: FileMetadata, downloads: Vec<DownloadLink>, elapsed_seconds: f64) -> Self {
        Self {
            file_name: metadata.file_name,
            file_size: metadata.file_size,
            downloads,
            elapsed_seconds,
        }
    }

    pub fn total_servers(&self) -> usize {
        self.downloads.len()
    }
}

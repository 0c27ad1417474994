//! Data models for scraped file pages.

mod download;

pub use download::{DownloadLink, FileMetadata, ScrapeRequest, ScrapeResult, UNKNOWN};

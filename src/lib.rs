//! gdscrape - metadata and mirror link extraction for GDFlix-style file hosts.
//!
//! A landing page is rendered (headless Chrome by default), the file name and
//! size are read from it, and its download buttons are classified into
//! canonical mirror categories. The [`server`] module wraps this pipeline in
//! an HTTP API with rate limiting and domain allow-listing.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod scrapers;
pub mod server;

pub use error::ScrapeError;

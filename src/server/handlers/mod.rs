//! HTTP request handlers for the API.

mod health;
mod scrape;
mod types;

// Re-export handlers for use by the router
pub use health::{health, not_found};
pub use scrape::{root, scrape};
pub use types::{ErrorBody, HealthStatus, ScrapeParams, ScrapeResponse, ServiceInfo};

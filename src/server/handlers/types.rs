//! JSON bodies returned by the API.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::models::{DownloadLink, ScrapeResult};

/// Query parameters accepted by the scrape endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub url: Option<String>,
}

/// Successful scrape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub file_name: String,
    pub file_size: String,
    pub total_servers: usize,
    pub downloads: Vec<DownloadLink>,
    /// Elapsed seconds, rounded to two decimals.
    pub response_time: f64,
}

impl From<ScrapeResult> for ScrapeResponse {
    fn from(result: ScrapeResult) -> Self {
        Self {
            success: true,
            kind: "file".to_string(),
            total_servers: result.total_servers(),
            response_time: (result.elapsed_seconds * 100.0).round() / 100.0,
            file_name: result.file_name,
            file_size: result.file_size,
            downloads: result.downloads,
        }
    }
}

/// Failure body shared by every error status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Informational body for `GET /` without a target.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub usage: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "running".to_string(),
            usage: "GET /scrape?url=<file page URL>".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

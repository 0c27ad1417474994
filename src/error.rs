//! Error taxonomy for scrape requests.
//!
//! Every failure inside the request pipeline is converted into one of these
//! variants at the request boundary; each maps to a single HTTP status.

use axum::http::StatusCode;

use crate::scrapers::browser::RenderError;

/// Failure outcome of a scrape request.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Missing, malformed or disallowed target URL.
    #[error("{0}")]
    InvalidRequest(String),
    /// Client exceeded its per-minute request ceiling.
    #[error("Rate limit exceeded. Max {limit} requests per minute")]
    RateLimited { limit: u32 },
    /// Navigation (or a strict readiness wait) exceeded its bound.
    #[error("{0}")]
    Timeout(String),
    /// Anything else, including pages without any download links.
    #[error("{0}")]
    ExtractionFailed(String),
}

impl ScrapeError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ScrapeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ScrapeError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ScrapeError::ExtractionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidRequest(_) => "invalid_request",
            ScrapeError::RateLimited { .. } => "rate_limited",
            ScrapeError::Timeout(_) => "timeout",
            ScrapeError::ExtractionFailed(_) => "extraction_failed",
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::RateLimited { .. } | ScrapeError::Timeout(_)
        )
    }
}

impl From<RenderError> for ScrapeError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::NavigationTimeout { .. } | RenderError::ReadyTimeout(_) => {
                ScrapeError::Timeout(e.to_string())
            }
            other => ScrapeError::ExtractionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ScrapeError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScrapeError::RateLimited { limit: 60 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ScrapeError::Timeout("x".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ScrapeError::ExtractionFailed("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_message_states_ceiling() {
        let err = ScrapeError::RateLimited { limit: 60 };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Max 60 requests per minute"
        );
        assert!(err.is_retryable());
        assert!(!ScrapeError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn test_render_error_mapping() {
        let nav = RenderError::NavigationTimeout {
            url: "https://gdflix.net/file/a".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(matches!(ScrapeError::from(nav), ScrapeError::Timeout(_)));

        let other = RenderError::Browser("tab crashed".into());
        match ScrapeError::from(other) {
            ScrapeError::ExtractionFailed(msg) => assert!(msg.contains("tab crashed")),
            e => panic!("unexpected mapping: {:?}", e),
        }
    }
}

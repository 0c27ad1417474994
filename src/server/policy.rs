//! Inbound request policy: client identity, rate limiting, URL validation.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use tracing::debug;
use url::Url;

use crate::config::Settings;
use crate::error::ScrapeError;
use crate::models::ScrapeRequest;
use crate::rate_limit::{ClientRateLimiter, RateDecision};

/// Identity used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Validate a raw `url` parameter against the domain allow-list.
///
/// The host must contain one of `allowed_domains` as a case-insensitive
/// substring. Only http and https targets are accepted.
pub fn validate_target(
    raw: Option<&str>,
    allowed_domains: &[String],
) -> Result<ScrapeRequest, ScrapeError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScrapeError::InvalidRequest("URL parameter required".to_string()))?;

    let url = Url::parse(raw)
        .map_err(|e| ScrapeError::InvalidRequest(format!("Invalid URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidRequest(format!(
            "Unsupported URL scheme: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let allowed = !host.is_empty()
        && allowed_domains
            .iter()
            .any(|d| !d.is_empty() && host.contains(&d.to_lowercase()));
    if !allowed {
        return Err(ScrapeError::InvalidRequest(format!(
            "Domain not allowed: {}. Allowed: {}",
            if host.is_empty() { raw } else { host.as_str() },
            allowed_domains.join(", ")
        )));
    }

    Ok(ScrapeRequest::new(url))
}

/// Per-request gatekeeping shared by all handlers.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    allowed_domains: Vec<String>,
    limiter: ClientRateLimiter,
    trust_forwarded: bool,
}

impl RequestPolicy {
    pub fn new(
        allowed_domains: Vec<String>,
        limiter: ClientRateLimiter,
        trust_forwarded: bool,
    ) -> Self {
        Self {
            allowed_domains,
            limiter,
            trust_forwarded,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.allowed_domains.clone(),
            ClientRateLimiter::with_config(settings.rate_limit_config()),
            settings.trust_forwarded,
        )
    }

    pub fn limiter(&self) -> &ClientRateLimiter {
        &self.limiter
    }

    pub fn validate(&self, raw: Option<&str>) -> Result<ScrapeRequest, ScrapeError> {
        validate_target(raw, &self.allowed_domains)
    }

    /// Count the request against `client`, then validate the target.
    ///
    /// Rejected requests still consume a slot in the window.
    pub async fn admit(
        &self,
        client: &str,
        raw: Option<&str>,
    ) -> Result<ScrapeRequest, ScrapeError> {
        if let RateDecision::Limited { limit, .. } = self.limiter.check(client).await {
            return Err(ScrapeError::RateLimited { limit });
        }
        self.validate(raw)
    }

    /// Resolve the rate limit key for a request.
    ///
    /// The first `X-Forwarded-For` entry wins when forwarding is trusted,
    /// then the socket peer, then [`UNKNOWN_CLIENT`].
    pub fn client_identity(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(addr) = forwarded {
                debug!("Client identified by X-Forwarded-For: {}", addr);
                return addr.to_string();
            }
        }

        peer.map(|p| p.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

//! Per-client request counting in wall-clock minute buckets.
//!
//! Counts live in a process-wide table keyed by `(client, minute)`. Every
//! increment evicts buckets older than the retained window, so the table
//! never grows beyond the clients seen in the last few minutes.

mod config;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub use config::{default_max_requests_per_minute, RateLimitConfig};

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32 },
    Limited { count: u32, limit: u32 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Fixed-window limiter shared across request tasks.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    config: RateLimitConfig,
    counts: Arc<Mutex<HashMap<(String, i64), u32>>>,
}

impl Default for ClientRateLimiter {
    fn default() -> Self {
        Self::with_config(RateLimitConfig::default())
    }
}

impl ClientRateLimiter {
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Current wall-clock minute since the Unix epoch.
    pub fn current_bucket() -> i64 {
        Utc::now().timestamp().div_euclid(60)
    }

    /// Count a request from `client` in the current minute.
    pub async fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Self::current_bucket()).await
    }

    /// Count a request from `client` in `bucket`.
    ///
    /// The increment happens before the comparison, so rejected requests
    /// still count toward the window.
    pub async fn check_at(&self, client: &str, bucket: i64) -> RateDecision {
        if !self.config.is_enabled() {
            return RateDecision::Allowed { count: 0 };
        }

        let mut counts = self.counts.lock().await;

        let oldest = bucket - i64::from(self.config.retained_buckets.max(1)) + 1;
        let before = counts.len();
        counts.retain(|(_, b), _| *b >= oldest);
        if counts.len() < before {
            debug!("Evicted {} expired rate limit entries", before - counts.len());
        }

        let count = counts.entry((client.to_string(), bucket)).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        let limit = self.config.max_requests_per_minute;
        if count > limit {
            if count == limit + 1 {
                warn!("Client {} exceeded {} requests per minute", client, limit);
            }
            RateDecision::Limited { count, limit }
        } else {
            RateDecision::Allowed { count }
        }
    }

    /// Number of `(client, minute)` entries currently held.
    pub async fn tracked_buckets(&self) -> usize {
        self.counts.lock().await.len()
    }
}

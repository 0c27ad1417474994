//! Rate limiter configuration.

use serde::{Deserialize, Serialize};

/// Per-client fixed-window limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per wall-clock minute. Zero disables limiting.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Minute buckets kept in the table, counting the current one.
    #[serde(default = "default_retained_buckets")]
    pub retained_buckets: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            retained_buckets: default_retained_buckets(),
        }
    }
}

impl RateLimitConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_requests_per_minute > 0
    }
}

pub fn default_max_requests_per_minute() -> u32 {
    60
}

fn default_retained_buckets() -> u32 {
    2
}

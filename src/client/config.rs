//! REST client configuration

use std::time::Duration;

use chrono::TimeDelta;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Connection settings for the REST backend
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Timeout for ordinary requests
    pub timeout: Duration,

    /// Timeout for the liveness probe
    pub health_timeout: Duration,

    /// Pause before the single retry of a request that failed with HTTP 500
    pub retry_delay: Duration,

    /// Loan period assumed for transactions the backend sends without a due
    /// date
    pub loan_period: TimeDelta,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            loan_period: TimeDelta::days(14),
        }
    }
}

impl ClientConfig {
    /// Configuration for `base_url` with default timeouts
    ///
    /// A trailing slash on the URL is dropped. An empty URL falls back to the
    /// default with a warning.
    pub fn new(base_url: &str) -> Self {
        let default = Self::default();
        let trimmed = base_url.trim().trim_end_matches('/');

        let base_url = if trimmed.is_empty() {
            tracing::warn!(
                "Empty backend URL, using default ({})",
                default.base_url
            );
            default.base_url.clone()
        } else {
            trimmed.to_string()
        };

        Self { base_url, ..default }
    }

    /// Absolute URL of an endpoint path such as `/books/3`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//! Client configuration
//!
//! All settings come from the environment with defaults that match a local
//! backend started on port 8000.

use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_USER_TYPE: &str = "engineer";
const DEFAULT_FEATURE_AREA: &str = "general";

/// How often the backend liveness probe runs.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(15);
/// Upper bound for a single liveness probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
/// TCP connect timeout for the chat stream. The stream itself has no
/// request timeout so it can stay open across long silences.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the backend connection
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash
    pub api_url: String,
    /// Reported as `metadata.user_type` on every question
    pub user_type: String,
    /// Reported as `metadata.feature_area` on every question
    pub feature_area: String,
    pub health_interval: Duration,
    pub health_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_type: DEFAULT_USER_TYPE.to_string(),
            feature_area: DEFAULT_FEATURE_AREA.to_string(),
            health_interval: DEFAULT_HEALTH_INTERVAL,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|&v| v > 0)
                .map_or(fallback, Duration::from_secs)
        };

        Self {
            api_url: lookup("DOCS_PORTAL_API_URL")
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.api_url, |v| v.trim().trim_end_matches('/').to_string()),
            user_type: lookup("DOCS_PORTAL_USER_TYPE").unwrap_or(defaults.user_type),
            feature_area: lookup("DOCS_PORTAL_FEATURE_AREA").unwrap_or(defaults.feature_area),
            health_interval: secs("DOCS_PORTAL_HEALTH_INTERVAL_SECS", defaults.health_interval),
            health_timeout: secs("DOCS_PORTAL_HEALTH_TIMEOUT_SECS", defaults.health_timeout),
            connect_timeout: secs("DOCS_PORTAL_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
        }
    }

    /// Point the config at a different backend, keeping everything else
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn chat_stream_url(&self) -> String {
        format!("{}/api/chat/stream", self.api_url)
    }

    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.api_url)
    }
}

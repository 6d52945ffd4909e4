//! Remote backend parameters.

use std::time::Duration;

use serde::Deserialize;

/// Default bound on any single remote round trip.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5000;

/// Connection parameters for the optional remote kernel service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    /// Base URL, e.g. `http://qpu-gateway:8080`. No trailing slash needed.
    pub endpoint: String,

    /// Human-readable name reported by `backend_info`.
    #[serde(default = "default_remote_name")]
    pub name: String,

    /// Timeout for the health probe and for each kernel request.
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    /// Build a config with default name and timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            name: default_remote_name(),
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the reported name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

fn default_remote_name() -> String {
    String::from("remote")
}

const fn default_remote_timeout_ms() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_MS
}

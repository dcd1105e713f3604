//! Adapter configuration

use std::time::Duration;
use url::Url;

/// Connection settings shared by every HTTP adapter
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Overrides the vendor's default endpoint (used by tests and proxies)
    pub base_url: Option<Url>,
    pub api_key: Option<String>,
    /// Upper bound applied by the HTTP client itself
    pub timeout: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl AdapterSettings {
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

//! Production API key management implementation
//!
//! Vendor credentials are loaded from:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//!
//! Environment variables take precedence over .env file values.
//!
//! ## Known Keys
//! - `IPINFO_TOKEN`: ipinfo.io token (optional; anonymous requests are rate limited)
//! - `ABUSEIPDB_API_KEY`: AbuseIPDB key (required for that provider)
//!
//! A provider whose required key is missing is registered disabled rather
//! than failing startup.

use std::collections::HashMap;

use crate::traits::ApiKeySource;

/// Real API key source using environment variables
pub struct RealApiKeySource;

impl RealApiKeySource {
    pub fn new() -> Self {
        Self::init_env();
        Self
    }

    /// Load the `.env` file if present
    ///
    /// Safe to call multiple times as dotenv ignores already set variables.
    fn init_env() {
        let _ = dotenv::dotenv();
    }
}

impl Default for RealApiKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeySource for RealApiKeySource {
    fn api_key(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.trim().is_empty())
    }
}

/// Fixed key set, used for tests and for embedding the lookup engine
#[derive(Debug, Clone, Default)]
pub struct StaticApiKeySource {
    keys: HashMap<String, String>,
}

impl StaticApiKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), value.into());
        self
    }
}

impl ApiKeySource for StaticApiKeySource {
    fn api_key(&self, name: &str) -> Option<String> {
        self.keys.get(name).cloned()
    }
}

//! Trait definitions with mockall annotations for testing
//!
//! These seams let the orchestrator be exercised with mock health tracking
//! and mock credential sources.

use shared::{ProviderHealth, ProviderId};

/// Rolling per-provider health shared across all lookups
///
/// Implementations must tolerate concurrent `record` calls from many lookups
/// without holding readers out for long.
#[mockall::automock]
pub trait HealthTracker: Send + Sync {
    /// Whether the provider should be dispatched to by default
    fn is_healthy(&self, provider: &ProviderId) -> bool;

    /// Record one lookup outcome for the provider
    fn record(&self, provider: &ProviderId, success: bool, latency_ms: u64);

    /// Current state of every tracked provider, ordered by id
    fn snapshot(&self) -> Vec<ProviderHealth>;
}

/// API key source abstraction for dependency injection
#[mockall::automock]
pub trait ApiKeySource: Send + Sync {
    /// Look up a key by environment variable name
    fn api_key(&self, name: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_trait_instantiation() {
        let mut health = MockHealthTracker::new();
        health.expect_is_healthy().returning(|_| true);
        assert!(health.is_healthy(&ProviderId::new("ipinfo")));

        let mut keys = MockApiKeySource::new();
        keys.expect_api_key().returning(|name| (name == "IPINFO_TOKEN").then(|| "token".to_string()));
        assert_eq!(keys.api_key("IPINFO_TOKEN").as_deref(), Some("token"));
        assert_eq!(keys.api_key("OTHER"), None);
    }
}

//! Canned provider answers and adapters for orchestrator tests

use std::sync::Arc;
use std::time::Duration;

use providers::{FixtureAdapter, ProviderAdapter};
use shared::{PartialResult, ProviderFailure};

pub struct TestFixtures;

impl TestFixtures {
    pub const IP: &'static str = "8.8.8.8";
    pub const TTL_SECONDS: u64 = 3600;
    pub const PROVIDER_TIMEOUT: Duration = Duration::from_millis(500);
    pub const GLOBAL_DEADLINE: Duration = Duration::from_secs(2);
    /// Longer than any deadline used in the tests
    pub const HANG: Duration = Duration::from_secs(3600);

    pub fn geo(country: &str, city: &str) -> PartialResult {
        PartialResult {
            country: Some(country.to_string()),
            city: Some(city.to_string()),
            ..Default::default()
        }
    }

    pub fn abuse(score: u8) -> PartialResult {
        PartialResult {
            abuse_score: Some(score),
            is_tor: Some(false),
            ..Default::default()
        }
    }

    pub fn vpn(name: &str) -> PartialResult {
        PartialResult {
            is_vpn: Some(true),
            vpn_provider: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Answers after `delay_ms` of simulated latency
    pub fn answering(id: &str, result: PartialResult, delay_ms: u64) -> Arc<dyn ProviderAdapter> {
        Arc::new(FixtureAdapter::new(id, result).with_delay(Duration::from_millis(delay_ms)))
    }

    /// Never answers within any test deadline
    pub fn hanging(id: &str) -> Arc<dyn ProviderAdapter> {
        Arc::new(FixtureAdapter::new(id, Self::geo("ZZ", "Nowhere")).with_delay(Self::HANG))
    }

    pub fn failing(id: &str, failure: ProviderFailure, delay_ms: u64) -> Arc<dyn ProviderAdapter> {
        Arc::new(FixtureAdapter::failing(id, failure).with_delay(Duration::from_millis(delay_ms)))
    }
}

//! Test helpers and builder patterns for orchestrator tests

use std::sync::Arc;
use std::time::Duration;

use orchestrator::services::{ProviderConfig, RegistryBuilder};
use orchestrator::traits::MockHealthTracker;
use orchestrator::{HealthPolicy, LookupOrchestrator, OrchestratorSettings, ProviderRegistry, RollingHealthTracker};
use providers::ProviderAdapter;
use shared::{ProviderId, ProviderOutcome};

use super::fixtures::TestFixtures;

/// Builds an orchestrator over fixture adapters with test-sized deadlines
pub struct OrchestratorBuilder {
    registry: RegistryBuilder,
    settings: OrchestratorSettings,
    provider_timeout: Duration,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::builder(),
            settings: OrchestratorSettings {
                global_deadline: TestFixtures::GLOBAL_DEADLINE,
                ..Default::default()
            },
            provider_timeout: TestFixtures::PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider(mut self, adapter: Arc<dyn ProviderAdapter>, trust_rank: u8) -> Self {
        let config = ProviderConfig::with_timeout(self.provider_timeout);
        self.registry = self.registry.register(adapter, trust_rank, true, config);
        self
    }

    pub fn with_disabled_provider(mut self, adapter: Arc<dyn ProviderAdapter>, trust_rank: u8) -> Self {
        let config = ProviderConfig::with_timeout(self.provider_timeout);
        self.registry = self.registry.register(adapter, trust_rank, false, config);
        self
    }

    /// Applies to providers registered after this call
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_global_deadline(mut self, deadline: Duration) -> Self {
        self.settings.global_deadline = deadline;
        self
    }

    fn registry(self) -> (Arc<ProviderRegistry>, OrchestratorSettings) {
        let registry = self.registry.build().expect("valid test registry");
        (Arc::new(registry), self.settings)
    }

    /// Orchestrator backed by the real rolling health tracker
    pub fn build(self) -> (LookupOrchestrator<RollingHealthTracker>, Arc<RollingHealthTracker>) {
        let (registry, settings) = self.registry();
        let health = Arc::new(RollingHealthTracker::for_registry(&registry, HealthPolicy::default()));
        (LookupOrchestrator::new(registry, Arc::clone(&health), settings), health)
    }

    /// Orchestrator backed by a mock tracker prepared by `setup`
    pub fn build_with_health<F>(self, setup: F) -> LookupOrchestrator<MockHealthTracker>
    where
        F: FnOnce(&mut MockHealthTracker),
    {
        let (registry, settings) = self.registry();
        let mut health = MockHealthTracker::new();
        setup(&mut health);
        LookupOrchestrator::new(registry, Arc::new(health), settings)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub fn outcome<'a>(outcomes: &'a [ProviderOutcome], provider: &str) -> &'a ProviderOutcome {
        let provider = ProviderId::new(provider);
        outcomes
            .iter()
            .find(|o| o.provider == provider)
            .unwrap_or_else(|| panic!("no outcome for {provider}"))
    }

    pub fn ids(outcomes: &[ProviderOutcome]) -> Vec<String> {
        outcomes.iter().map(|o| o.provider.to_string()).collect()
    }

    /// Give the background health reporter a chance to drain
    pub async fn drain_health_queue() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}

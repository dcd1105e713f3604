//! Provider registry
//!
//! Static, process-wide mapping from provider id to adapter, trust rank,
//! enablement and connection config. Built once at startup and read-only
//! afterwards; lookups share it behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use providers::ProviderAdapter;
use shared::{ProviderId, TrustRank};
use crate::error::{OrchestratorError, OrchestratorResult};

/// Per-provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub timeout: Duration,
    pub api_key: Option<String>,
    pub base_url: Option<Url>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            api_key: None,
            base_url: None,
        }
    }
}

impl ProviderConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

pub struct RegistryEntry {
    pub id: ProviderId,
    pub adapter: Arc<dyn ProviderAdapter>,
    pub trust_rank: TrustRank,
    pub enabled: bool,
    pub config: ProviderConfig,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &self.id)
            .field("trust_rank", &self.trust_rank)
            .field("enabled", &self.enabled)
            .field("timeout", &self.config.timeout)
            .field("has_api_key", &self.config.api_key.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<ProviderId, Arc<RegistryEntry>>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, provider: &ProviderId) -> Option<&Arc<RegistryEntry>> {
        self.entries.get(provider)
    }

    pub fn trust_rank(&self, provider: &ProviderId) -> Option<TrustRank> {
        self.entries.get(provider).map(|e| e.trust_rank)
    }

    /// All entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &Arc<RegistryEntry>> {
        self.entries.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<RegistryEntry>> {
        self.entries.values().filter(|e| e.enabled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects registrations and reports the first invalid one on `build`
#[derive(Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<ProviderId, Arc<RegistryEntry>>,
    error: Option<OrchestratorError>,
}

impl RegistryBuilder {
    pub fn register(
        mut self,
        adapter: Arc<dyn ProviderAdapter>,
        trust_rank: TrustRank,
        enabled: bool,
        config: ProviderConfig,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        let id = adapter.id();
        if trust_rank == 0 {
            self.error = Some(OrchestratorError::InvalidTrustRank {
                provider: id.to_string(),
                rank: trust_rank,
            });
            return self;
        }
        if self.entries.contains_key(&id) {
            self.error = Some(OrchestratorError::DuplicateProvider { provider: id.to_string() });
            return self;
        }

        let entry = RegistryEntry {
            id: id.clone(),
            adapter,
            trust_rank,
            enabled,
            config,
        };
        self.entries.insert(id, Arc::new(entry));
        self
    }

    pub fn build(self) -> OrchestratorResult<ProviderRegistry> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(ProviderRegistry { entries: self.entries }),
        }
    }
}

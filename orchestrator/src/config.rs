//! Provider configuration and registry construction
//!
//! Providers come from a JSON file (or the built-in table below) and are
//! turned into a [`ProviderRegistry`] once at startup. Credentials are never
//! stored in the file, only the name of the environment variable holding them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use providers::{build_adapter, demo_fixtures, requires_api_key, AdapterSettings, ProviderAdapter};
use providers::{ABUSEIPDB_ID, IPINFO_ID, IP_API_ID};
use shared::{ProviderId, SourceTag, TrustRank};

use crate::core::health::HealthPolicy;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::OrchestratorSettings;
use crate::services::registry::{ProviderConfig, ProviderRegistry};
use crate::traits::ApiKeySource;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GLOBAL_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// One provider entry in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub id: String,
    pub trust_rank: TrustRank,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the provider's API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersFile {
    pub providers: Vec<ProviderSpec>,
}

/// Built-in provider table: the abuse database outranks the geolocation services
pub fn default_provider_specs() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec {
            id: ABUSEIPDB_ID.to_string(),
            trust_rank: 9,
            enabled: true,
            timeout_ms: None,
            base_url: None,
            api_key_env: Some("ABUSEIPDB_API_KEY".to_string()),
        },
        ProviderSpec {
            id: IPINFO_ID.to_string(),
            trust_rank: 7,
            enabled: true,
            timeout_ms: None,
            base_url: None,
            api_key_env: Some("IPINFO_TOKEN".to_string()),
        },
        ProviderSpec {
            id: IP_API_ID.to_string(),
            trust_rank: 5,
            enabled: true,
            timeout_ms: None,
            base_url: None,
            api_key_env: None,
        },
    ]
}

pub fn load_provider_specs(path: &Path) -> OrchestratorResult<Vec<ProviderSpec>> {
    let contents = std::fs::read_to_string(path)?;
    let file: ProvidersFile = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), providers = file.providers.len(), "Loaded provider configuration");
    Ok(file.providers)
}

/// Build the registry for the configured vendor adapters
///
/// A provider whose key is required but missing is registered disabled.
pub fn build_registry(
    specs: &[ProviderSpec],
    keys: &dyn ApiKeySource,
    default_timeout: Duration,
) -> OrchestratorResult<ProviderRegistry> {
    let mut builder = ProviderRegistry::builder();

    for spec in specs {
        let id = ProviderId::new(&spec.id);
        if id.as_str().is_empty() {
            return Err(OrchestratorError::config("providers.id", "provider id must not be empty"));
        }

        let timeout = match spec.timeout_ms {
            Some(0) => {
                return Err(OrchestratorError::config(
                    format!("providers.{id}.timeout_ms"),
                    "timeout must be positive",
                ))
            }
            Some(ms) => Duration::from_millis(ms),
            None => default_timeout,
        };

        let base_url = spec
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| OrchestratorError::config(format!("providers.{id}.base_url"), e.to_string()))
            })
            .transpose()?;

        let api_key = spec.api_key_env.as_deref().and_then(|name| keys.api_key(name));

        let mut enabled = spec.enabled;
        if enabled && requires_api_key(&id) && api_key.is_none() {
            warn!(
                provider = %id,
                key = spec.api_key_env.as_deref().unwrap_or("<unset>"),
                "API key missing, provider disabled"
            );
            enabled = false;
        }

        let mut settings = AdapterSettings::default().with_timeout(timeout);
        if let Some(url) = &base_url {
            settings = settings.with_base_url(url.clone());
        }
        if let Some(key) = &api_key {
            settings = settings.with_api_key(key.clone());
        }
        let adapter = build_adapter(&id, &settings)?;

        debug!(provider = %id, trust_rank = spec.trust_rank, enabled, "Registering provider");
        builder = builder.register(
            adapter,
            spec.trust_rank,
            enabled,
            ProviderConfig {
                timeout,
                api_key,
                base_url,
            },
        );
    }

    builder.build()
}

/// Offline registry backed by canned fixture answers
pub fn fixture_registry(default_timeout: Duration) -> OrchestratorResult<ProviderRegistry> {
    demo_fixtures()
        .into_iter()
        .fold(ProviderRegistry::builder(), |builder, (adapter, rank)| {
            let adapter: Arc<dyn ProviderAdapter> = Arc::new(adapter);
            builder.register(adapter, rank, true, ProviderConfig::with_timeout(default_timeout))
        })
        .build()
}

/// Per-lookup knobs chosen by the caller
#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub global_deadline: Duration,
    pub provider_timeout: Duration,
    pub ttl_seconds: u64,
    pub source: SourceTag,
    pub skip_unhealthy: bool,
    pub health: HealthPolicy,
    pub health_queue_capacity: usize,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            global_deadline: DEFAULT_GLOBAL_DEADLINE,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            source: SourceTag::Live,
            skip_unhealthy: true,
            health: HealthPolicy::default(),
            health_queue_capacity: 256,
        }
    }
}

impl LookupSettings {
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.global_deadline.is_zero() {
            return Err(OrchestratorError::config("deadline", "must be positive"));
        }
        if self.provider_timeout.is_zero() {
            return Err(OrchestratorError::config("provider_timeout", "must be positive"));
        }
        if self.ttl_seconds == 0 {
            return Err(OrchestratorError::config("ttl", "must be positive"));
        }
        if self.health.window_size == 0 {
            return Err(OrchestratorError::config("health.window_size", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.health.unhealthy_below) {
            return Err(OrchestratorError::config(
                "health.unhealthy_below",
                format!("{} is not a rate between 0 and 1", self.health.unhealthy_below),
            ));
        }
        if self.health_queue_capacity == 0 {
            return Err(OrchestratorError::config("health_queue_capacity", "must be positive"));
        }
        Ok(())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            global_deadline: self.global_deadline,
            skip_unhealthy: self.skip_unhealthy,
            health_queue_capacity: self.health_queue_capacity,
        }
    }
}

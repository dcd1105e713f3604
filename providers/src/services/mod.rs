//! Adapter implementations
//!
//! Vendor adapters are registered statically here; the registry builds them
//! once at startup through `build_adapter`.

pub mod abuseipdb;
pub mod fixture;
pub mod http;
pub mod ip_api;
pub mod ipinfo;

#[cfg(test)]
pub mod tests;

use std::sync::Arc;

use shared::ProviderId;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::ProviderAdapter;
use crate::types::AdapterSettings;

pub use abuseipdb::{AbuseIpDbAdapter, ABUSEIPDB_ID};
pub use fixture::{demo_fixtures, FixtureAdapter};
pub use ip_api::{IpApiAdapter, IP_API_ID};
pub use ipinfo::{IpInfoAdapter, IPINFO_ID};

/// Vendor adapters this crate knows how to build
pub const KNOWN_PROVIDERS: &[&str] = &[IP_API_ID, IPINFO_ID, ABUSEIPDB_ID];

/// Whether the vendor refuses anonymous requests
pub fn requires_api_key(provider: &ProviderId) -> bool {
    provider.as_str() == ABUSEIPDB_ID
}

/// Build the adapter registered under `provider`
pub fn build_adapter(provider: &ProviderId, settings: &AdapterSettings) -> ProviderResult<Arc<dyn ProviderAdapter>> {
    let adapter: Arc<dyn ProviderAdapter> = match provider.as_str() {
        IP_API_ID => Arc::new(IpApiAdapter::new(settings)?),
        IPINFO_ID => Arc::new(IpInfoAdapter::new(settings)?),
        ABUSEIPDB_ID => Arc::new(AbuseIpDbAdapter::new(settings)?),
        other => {
            return Err(ProviderError::UnknownProvider {
                provider: other.to_string(),
            })
        }
    };
    Ok(adapter)
}

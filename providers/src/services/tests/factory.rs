//! Tests for static adapter registration

use shared::ProviderId;
use crate::error::ProviderError;
use crate::services::{build_adapter, requires_api_key, KNOWN_PROVIDERS};
use crate::types::AdapterSettings;

#[test]
fn test_every_known_provider_builds() {
    for name in KNOWN_PROVIDERS {
        let id = ProviderId::new(name);
        let adapter = build_adapter(&id, &AdapterSettings::default()).unwrap();
        assert_eq!(adapter.id(), id);
    }
}

#[test]
fn test_unknown_provider_is_rejected() {
    let result = build_adapter(&ProviderId::new("shodan"), &AdapterSettings::default());
    assert!(matches!(result, Err(ProviderError::UnknownProvider { provider }) if provider == "shodan"));
}

#[test]
fn test_only_abuseipdb_requires_a_key() {
    assert!(requires_api_key(&ProviderId::new("abuseipdb")));
    assert!(!requires_api_key(&ProviderId::new("ip-api")));
    assert!(!requires_api_key(&ProviderId::new("ipinfo")));
}

//! Tests for the adapter implementations
//!
//! HTTP adapters are exercised against a local `wiremock` server so every
//! vendor mapping (success, no data, vendor error, status codes, cancellation)
//! runs without network access.

pub mod factory;
pub mod ip_api;

use std::time::Duration;

use shared::CancellationSignal;
use url::Url;
use wiremock::MockServer;

use crate::types::AdapterSettings;

/// Settings pointing at the mock server
pub fn mock_settings(server: &MockServer) -> AdapterSettings {
    AdapterSettings::default()
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_timeout(Duration::from_secs(5))
}

/// A signal generous enough never to fire during a test
pub fn patient_signal() -> CancellationSignal {
    CancellationSignal::new(Duration::from_secs(30))
}

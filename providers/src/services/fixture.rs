//! Deterministic offline adapter
//!
//! Returns a canned answer after an optional delay. Used for offline runs of
//! the binary and for exercising the orchestrator without a network.

use std::time::Duration;

use async_trait::async_trait;

use shared::{CancellationSignal, PartialResult, ProviderFailure, ProviderId};
use crate::traits::ProviderAdapter;

pub struct FixtureAdapter {
    id: ProviderId,
    answer: Result<PartialResult, ProviderFailure>,
    delay: Duration,
}

impl FixtureAdapter {
    pub fn new(id: impl Into<ProviderId>, result: PartialResult) -> Self {
        Self {
            id: id.into(),
            answer: Ok(result),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(id: impl Into<ProviderId>, failure: ProviderFailure) -> Self {
        Self {
            id: id.into(),
            answer: Err(failure),
            delay: Duration::ZERO,
        }
    }

    /// Simulated network latency; a delay longer than the timeout makes the fixture hang
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ProviderAdapter for FixtureAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn lookup(&self, _ip: &str, cancel: &CancellationSignal) -> Result<PartialResult, ProviderFailure> {
        if cancel.is_cancelled() {
            return Err(cancel.failure());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => self.answer.clone(),
            _ = cancel.cancelled() => Err(cancel.failure()),
        }
    }
}

/// A small set of fixtures that agree on most fields and disagree on a few
///
/// Returned as `(adapter, trust_rank)` pairs for registry construction.
pub fn demo_fixtures() -> Vec<(FixtureAdapter, u8)> {
    let geo = PartialResult {
        asn: Some("AS15169".to_string()),
        org: Some("Google LLC".to_string()),
        country: Some("US".to_string()),
        region: Some("California".to_string()),
        city: Some("Mountain View".to_string()),
        latitude: Some(37.4056),
        longitude: Some(-122.0775),
        timezone: Some("America/Los_Angeles".to_string()),
        is_proxy: Some(false),
        is_hosting: Some(true),
        is_mobile: Some(false),
        ..Default::default()
    };
    let privacy = PartialResult {
        asn: Some("AS15169".to_string()),
        org: Some("Google LLC".to_string()),
        country: Some("US".to_string()),
        region: Some("California".to_string()),
        city: Some("Mountain View".to_string()),
        latitude: Some(37.386),
        longitude: Some(-122.0838),
        timezone: Some("America/Los_Angeles".to_string()),
        is_proxy: Some(false),
        is_vpn: Some(false),
        is_tor: Some(false),
        is_hosting: Some(true),
        ..Default::default()
    };
    let abuse = PartialResult {
        org: Some("Google LLC".to_string()),
        country: Some("US".to_string()),
        city: Some("Santa Clara".to_string()),
        is_tor: Some(false),
        abuse_score: Some(12),
        ..Default::default()
    };

    vec![
        (FixtureAdapter::new("fixture-geo", geo).with_delay(Duration::from_millis(40)), 5),
        (FixtureAdapter::new("fixture-privacy", privacy).with_delay(Duration::from_millis(80)), 7),
        (FixtureAdapter::new("fixture-abuse", abuse).with_delay(Duration::from_millis(120)), 9),
    ]
}

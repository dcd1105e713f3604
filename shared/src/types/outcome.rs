//! Per-provider lookup results and failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ProviderId, TrustRank};

/// One provider's answer for one IP
///
/// Every field is optional. `None` means the provider had no opinion, which is
/// not the same thing as an explicit `false` or `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    /// Normalized as `"AS" + number`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// ISO-3166-1 alpha-2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// IANA timezone name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vpn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_tor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hosting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mobile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_provider: Option<String>,
    /// 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abuse_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Opaque vendor payload kept for debugging and audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl PartialResult {
    /// True when the provider contributed at least one informative field
    pub fn has_data(&self) -> bool {
        self.asn.is_some()
            || self.org.is_some()
            || self.country.is_some()
            || self.region.is_some()
            || self.city.is_some()
            || self.coordinates().is_some()
            || self.timezone.is_some()
            || self.is_proxy.is_some()
            || self.is_vpn.is_some()
            || self.is_tor.is_some()
            || self.is_hosting.is_some()
            || self.is_mobile.is_some()
            || self.vpn_provider.is_some()
            || self.abuse_score.is_some()
    }

    /// Coordinate pair, only when both axes are present and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Failure reasons for a single provider lookup
///
/// Always scoped to one provider and never escalated past the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderFailure {
    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("vendor error: {0}")]
    VendorError(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Either the provider's partial result or why it produced none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success { result: PartialResult },
    Failure { reason: ProviderFailure },
}

/// Outcome of one provider lookup, stamped with the provider's trust rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub provider: ProviderId,
    pub trust_rank: TrustRank,
    pub latency_ms: u64,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ProviderOutcome {
    pub fn success(provider: ProviderId, trust_rank: TrustRank, latency_ms: u64, result: PartialResult) -> Self {
        Self {
            provider,
            trust_rank,
            latency_ms,
            status: OutcomeStatus::Success { result },
        }
    }

    pub fn failure(provider: ProviderId, trust_rank: TrustRank, latency_ms: u64, reason: ProviderFailure) -> Self {
        Self {
            provider,
            trust_rank,
            latency_ms,
            status: OutcomeStatus::Failure { reason },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn result(&self) -> Option<&PartialResult> {
        match &self.status {
            OutcomeStatus::Success { result } => Some(result),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&ProviderFailure> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { reason } => Some(reason),
        }
    }

    pub fn notice(&self) -> CompletionNotice {
        CompletionNotice {
            provider: self.provider.clone(),
            success: self.is_success(),
        }
    }
}

/// Emitted once per provider as soon as it finishes, in real completion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub provider: ProviderId,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_partial_result_has_no_data() {
        assert!(!PartialResult::default().has_data());
    }

    #[test]
    fn test_explicit_false_counts_as_an_opinion() {
        let result = PartialResult {
            is_vpn: Some(false),
            ..Default::default()
        };
        assert!(result.has_data());
    }

    #[test]
    fn test_half_coordinate_pair_is_not_data() {
        let result = PartialResult {
            latitude: Some(40.0),
            ..Default::default()
        };
        assert!(!result.has_data());
        assert_eq!(result.coordinates(), None);
    }

    #[test]
    fn test_non_finite_coordinate_pair_is_not_data() {
        let result = PartialResult {
            latitude: Some(f64::NAN),
            longitude: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(!result.has_data());
        assert_eq!(result.coordinates(), None);
    }

    #[test]
    fn test_failure_outcome_serialization() {
        let outcome = ProviderOutcome::failure(ProviderId::new("ipinfo"), 7, 5000, ProviderFailure::Timeout);
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["provider"], "ipinfo");
        assert_eq!(json["trustRank"], 7);
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"]["kind"], "timeout");
        assert_eq!(outcome.failure_reason().unwrap().to_string(), "timeout");
    }

    #[test]
    fn test_notice_mirrors_outcome() {
        let outcome = ProviderOutcome::success(ProviderId::new("ip-api"), 5, 120, PartialResult::default());
        let notice = outcome.notice();
        assert_eq!(notice.provider.as_str(), "ip-api");
        assert!(notice.success);
    }
}

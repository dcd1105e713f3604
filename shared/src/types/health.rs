//! Provider health snapshot

use serde::{Deserialize, Serialize};

use super::{ProviderId, TrustRank};

/// Point-in-time view of one provider's rolling health window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider: ProviderId,
    pub enabled: bool,
    pub healthy: bool,
    pub trust_rank: TrustRank,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub samples: usize,
}

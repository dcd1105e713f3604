//! The canonical correlated record and its conflict trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ProviderId, ProviderOutcome, TrustRank};
use crate::errors::SharedError;

/// Where a record came from, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Cache,
    Db,
    Live,
    Stale,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Cache => write!(f, "cache"),
            SourceTag::Db => write!(f, "db"),
            SourceTag::Live => write!(f, "live"),
            SourceTag::Stale => write!(f, "stale"),
        }
    }
}

impl FromStr for SourceTag {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cache" => Ok(SourceTag::Cache),
            "db" => Ok(SourceTag::Db),
            "live" => Ok(SourceTag::Live),
            "stale" => Ok(SourceTag::Stale),
            _ => Err(SharedError::UnknownSourceTag { input: s.to_string() }),
        }
    }
}

/// Granularity of the merged location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    City,
    Region,
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Rule that picked the merged value of a conflicting field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeReason {
    #[serde(rename = "majority vote")]
    MajorityVote,
    #[serde(rename = "highest trust")]
    HighestTrust,
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "boolean union")]
    BooleanUnion,
    #[serde(rename = "maximum")]
    Maximum,
}

impl fmt::Display for MergeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MergeReason::MajorityVote => "majority vote",
            MergeReason::HighestTrust => "highest trust",
            MergeReason::Average => "average",
            MergeReason::BooleanUnion => "boolean union",
            MergeReason::Maximum => "maximum",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub provider: ProviderId,
    pub trust_rank: TrustRank,
}

/// One distinct value seen for a field and who reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedValue {
    pub value: serde_json::Value,
    pub contributors: Vec<Contributor>,
}

/// Disagreement between providers on a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub field: String,
    pub values: Vec<ObservedValue>,
    pub chosen: serde_json::Value,
    pub reason: MergeReason,
}

impl ConflictReport {
    /// Every provider that contributed any value for this field
    pub fn providers(&self) -> Vec<&ProviderId> {
        let mut providers: Vec<&ProviderId> = self
            .values
            .iter()
            .flat_map(|v| v.contributors.iter().map(|c| &c.provider))
            .collect();
        providers.sort();
        providers
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<AccuracyTier>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.region.is_none()
            && self.city.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.timezone.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
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
    pub confidence: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abuse_score: Option<u8>,
    /// `None` when no provider contributed usable data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub provider_results: Vec<ProviderOutcome>,
    pub conflicts: Vec<ConflictReport>,
    pub source: SourceTag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub warnings: Vec<String>,
    pub partial_data: bool,
    pub providers_queried: usize,
    pub providers_succeeded: usize,
}

/// Canonical, immutable answer for one IP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedRecord {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    pub location: Location,
    pub flags: Flags,
    pub threat: Threat,
    pub metadata: Metadata,
}

impl CorrelatedRecord {
    pub fn confidence(&self) -> u8 {
        self.flags.confidence
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.metadata.expires_at
    }

    pub fn conflict(&self, field: &str) -> Option<&ConflictReport> {
        self.metadata.conflicts.iter().find(|c| c.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_round_trip_through_str() {
        for tag in [SourceTag::Cache, SourceTag::Db, SourceTag::Live, SourceTag::Stale] {
            assert_eq!(tag.to_string().parse::<SourceTag>().unwrap(), tag);
        }
        assert!("redis".parse::<SourceTag>().is_err());
    }

    #[test]
    fn test_merge_reason_wire_names() {
        assert_eq!(serde_json::to_string(&MergeReason::MajorityVote).unwrap(), "\"majority vote\"");
        assert_eq!(serde_json::to_string(&MergeReason::BooleanUnion).unwrap(), "\"boolean union\"");
        assert_eq!(MergeReason::HighestTrust.to_string(), "highest trust");
        // Agreement is never reported, so it has no reason of its own
        assert!(serde_json::from_str::<MergeReason>("\"single source\"").is_err());
    }

    #[test]
    fn test_absent_flags_are_omitted() {
        let flags = Flags {
            is_vpn: Some(false),
            confidence: 80,
            ..Default::default()
        };
        let json = serde_json::to_value(&flags).unwrap();
        assert_eq!(json["isVpn"], false);
        assert!(json.get("isProxy").is_none());
        assert_eq!(json["confidence"], 80);
    }
}

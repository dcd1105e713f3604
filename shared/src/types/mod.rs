//! Core types used throughout the lookup system

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod health;
pub mod outcome;
pub mod record;

pub use health::ProviderHealth;
pub use outcome::{CompletionNotice, OutcomeStatus, PartialResult, ProviderFailure, ProviderOutcome};
pub use record::{
    AccuracyTier, ConflictReport, Contributor, CorrelatedRecord, Flags, Location, MergeReason, Metadata,
    ObservedValue, RiskLevel, SourceTag, Threat,
};

/// Static per-provider weight used to break tied majority votes
pub type TrustRank = u8;

/// Identifier for an intelligence provider (e.g. `ipinfo`, `abuseipdb`)
///
/// Identifiers are case-insensitive and stored lowercased, so `IPinfo` and
/// `ipinfo` refer to the same registry entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_is_normalized() {
        assert_eq!(ProviderId::new("  IPinfo "), ProviderId::new("ipinfo"));
        assert_eq!(ProviderId::from("AbuseIPDB").to_string(), "abuseipdb");
    }

    #[test]
    fn test_provider_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProviderId::new("ip-api")).unwrap();
        assert_eq!(json, "\"ip-api\"");
    }
}

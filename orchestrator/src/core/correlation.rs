//! Correlation engine
//!
//! Folds the per-provider outcomes of one lookup into a single
//! [`CorrelatedRecord`]. The merge is a pure function of its inputs plus one
//! read of the clock: outcomes are sorted by provider id before anything else
//! happens, so arrival order never leaks into the record.
//!
//! Field strategies:
//! - text fields (ASN, org, country, region, city, timezone): majority vote,
//!   ties broken by the single highest-trust contributor
//! - coordinates: mean over complete pairs only
//! - detector flags: logical OR over providers with an opinion
//! - VPN provider name: highest-trust provider among those reporting a VPN
//! - abuse score: maximum

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use shared::{
    AccuracyTier, ConflictReport, Contributor, CorrelatedRecord, Flags, Location, MergeReason, Metadata,
    ObservedValue, PartialResult, ProviderId, ProviderOutcome, RiskLevel, SourceTag, Threat, TrustRank,
};

/// Decimal places kept on merged coordinates
const COORDINATE_DECIMALS: i32 = 6;
/// Confidence penalty per conflicting field
const CONFLICT_PENALTY: f64 = 0.1;
/// Cap on the total conflict penalty
const MAX_CONFLICT_PENALTY: f64 = 0.5;

const HIGH_RISK_ABUSE_SCORE: u8 = 70;
const MEDIUM_RISK_ABUSE_SCORE: u8 = 30;

/// Merge a lookup's outcomes, stamping the record with the current time
pub fn correlate(ip: &str, outcomes: &[ProviderOutcome], source: SourceTag, ttl_seconds: u64) -> CorrelatedRecord {
    correlate_at(ip, outcomes, source, ttl_seconds, Utc::now())
}

/// Merge a lookup's outcomes as of `now`
pub fn correlate_at(
    ip: &str,
    outcomes: &[ProviderOutcome],
    source: SourceTag,
    ttl_seconds: u64,
    now: DateTime<Utc>,
) -> CorrelatedRecord {
    let mut outcomes = outcomes.to_vec();
    outcomes.sort_by(|a, b| {
        a.provider
            .cmp(&b.provider)
            .then_with(|| a.trust_rank.cmp(&b.trust_rank))
            .then_with(|| a.latency_ms.cmp(&b.latency_ms))
    });

    let sources: Vec<Source<'_>> = outcomes
        .iter()
        .filter_map(|outcome| {
            outcome.result().map(|result| Source {
                provider: &outcome.provider,
                trust_rank: outcome.trust_rank,
                result,
            })
        })
        .collect();
    let has_data = sources.iter().any(|s| s.result.has_data());

    let mut merger = FieldMerger::new(sources);

    let asn = merger.text("asn", |r| r.asn.clone());
    let org = merger.text("org", |r| r.org.clone());
    let country = merger.text("country", |r| r.country.clone());
    let region = merger.text("region", |r| r.region.clone());
    let city = merger.text("city", |r| r.city.clone());
    let (latitude, longitude) = merger.coordinates();
    let timezone = merger.text("timezone", |r| r.timezone.clone());

    let is_proxy = merger.flag("isProxy", |r| r.is_proxy);
    let is_vpn = merger.flag("isVpn", |r| r.is_vpn);
    let is_tor = merger.flag("isTor", |r| r.is_tor);
    let is_hosting = merger.flag("isHosting", |r| r.is_hosting);
    let is_mobile = merger.flag("isMobile", |r| r.is_mobile);
    let vpn_provider = merger.vpn_provider();
    let abuse_score = merger.abuse_score();

    let conflicts = merger.into_conflicts();

    let accuracy = derive_accuracy(city.as_deref(), region.as_deref(), country.as_deref());
    let location = Location {
        country,
        region,
        city,
        latitude,
        longitude,
        timezone,
        accuracy,
    };

    let providers_queried = outcomes.len();
    let providers_succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let confidence = compute_confidence(providers_succeeded, providers_queried, conflicts.len(), has_data);

    let risk_level = has_data.then(|| derive_risk_level(is_tor, is_vpn, is_proxy, abuse_score));

    let warnings: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.failure_reason().map(|reason| format!("{} failed: {}", o.provider, reason)))
        .collect();
    let partial_data = !warnings.is_empty();

    debug!(
        ip,
        providers_queried,
        providers_succeeded,
        conflicts = conflicts.len(),
        confidence,
        "Correlated provider outcomes"
    );

    CorrelatedRecord {
        ip: ip.to_string(),
        asn,
        org,
        location,
        flags: Flags {
            is_proxy,
            is_vpn,
            is_tor,
            is_hosting,
            is_mobile,
            vpn_provider,
            confidence,
        },
        threat: Threat { abuse_score, risk_level },
        metadata: Metadata {
            provider_results: outcomes,
            conflicts,
            source,
            created_at: now,
            updated_at: now,
            expires_at: expiry(now, ttl_seconds),
            ttl_seconds,
            warnings,
            partial_data,
            providers_queried,
            providers_succeeded,
        },
    }
}

/// First match wins: tor or abuse >= 70 is high, any anonymiser or abuse >= 30 is medium
pub fn derive_risk_level(
    is_tor: Option<bool>,
    is_vpn: Option<bool>,
    is_proxy: Option<bool>,
    abuse_score: Option<u8>,
) -> RiskLevel {
    let abuse = abuse_score.unwrap_or(0);
    if is_tor == Some(true) || abuse >= HIGH_RISK_ABUSE_SCORE {
        RiskLevel::High
    } else if is_vpn == Some(true) || is_proxy == Some(true) || abuse >= MEDIUM_RISK_ABUSE_SCORE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// 0-100; scales with the success ratio and loses 10 points per conflict, at most half
pub fn compute_confidence(succeeded: usize, queried: usize, conflicts: usize, has_data: bool) -> u8 {
    if queried == 0 || succeeded == 0 || !has_data {
        return 0;
    }
    let ratio = succeeded as f64 / queried as f64;
    let penalty = (CONFLICT_PENALTY * conflicts as f64).min(MAX_CONFLICT_PENALTY);
    (100.0 * ratio * (1.0 - penalty)).round().clamp(0.0, 100.0) as u8
}

fn derive_accuracy(city: Option<&str>, region: Option<&str>, country: Option<&str>) -> Option<AccuracyTier> {
    if city.is_some() {
        Some(AccuracyTier::City)
    } else if region.is_some() {
        Some(AccuracyTier::Region)
    } else if country.is_some() {
        Some(AccuracyTier::Country)
    } else {
        None
    }
}

fn expiry(created_at: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    chrono::Duration::from_std(std::time::Duration::from_secs(ttl_seconds))
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

/// A successful provider result plus who reported it
#[derive(Clone, Copy)]
struct Source<'a> {
    provider: &'a ProviderId,
    trust_rank: TrustRank,
    result: &'a PartialResult,
}

impl Source<'_> {
    fn contributor(&self) -> Contributor {
        Contributor {
            provider: self.provider.clone(),
            trust_rank: self.trust_rank,
        }
    }
}

/// Providers that reported one distinct value for a field
struct Group<T> {
    value: T,
    contributors: Vec<Contributor>,
}

impl<T> Group<T> {
    /// Highest trust rank, smallest provider id on equal rank
    fn top_contributor(&self) -> Option<&Contributor> {
        self.contributors.iter().max_by(|a, b| {
            a.trust_rank
                .cmp(&b.trust_rank)
                .then_with(|| b.provider.cmp(&a.provider))
        })
    }
}

fn outranks(candidate: &Contributor, current: &Contributor) -> bool {
    candidate.trust_rank > current.trust_rank
        || (candidate.trust_rank == current.trust_rank && candidate.provider < current.provider)
}

/// Index of the group holding the single most trusted contributor
fn most_trusted<T>(groups: &[&Group<T>]) -> usize {
    let mut best: Option<(usize, &Contributor)> = None;
    for (index, group) in groups.iter().enumerate() {
        let Some(top) = group.top_contributor() else { continue };
        match best {
            Some((_, current)) if !outranks(top, current) => {}
            _ => best = Some((index, top)),
        }
    }
    best.map(|(index, _)| index).unwrap_or(0)
}

struct FieldMerger<'a> {
    sources: Vec<Source<'a>>,
    conflicts: Vec<ConflictReport>,
}

impl<'a> FieldMerger<'a> {
    fn new(sources: Vec<Source<'a>>) -> Self {
        Self {
            sources,
            conflicts: Vec::new(),
        }
    }

    fn into_conflicts(self) -> Vec<ConflictReport> {
        self.conflicts
    }

    fn group<T, F>(&self, extract: F) -> Vec<Group<T>>
    where
        T: PartialEq,
        F: Fn(&PartialResult) -> Option<T>,
    {
        let mut groups: Vec<Group<T>> = Vec::new();
        for source in &self.sources {
            let Some(value) = extract(source.result) else { continue };
            match groups.iter_mut().find(|g| g.value == value) {
                Some(group) => group.contributors.push(source.contributor()),
                None => groups.push(Group {
                    value,
                    contributors: vec![source.contributor()],
                }),
            }
        }
        groups
    }

    fn report<T: Into<Value>>(&mut self, field: &str, groups: Vec<Group<T>>, chosen: Value, reason: MergeReason) {
        let mut values: Vec<ObservedValue> = groups
            .into_iter()
            .map(|g| ObservedValue {
                value: g.value.into(),
                contributors: g.contributors,
            })
            .collect();
        values.sort_by(|a, b| {
            b.contributors
                .len()
                .cmp(&a.contributors.len())
                .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
        });

        debug!(field, reason = %reason, chosen = %chosen, "Providers disagree");
        self.conflicts.push(ConflictReport {
            field: field.to_string(),
            values,
            chosen,
            reason,
        });
    }

    fn text<F>(&mut self, field: &str, extract: F) -> Option<String>
    where
        F: Fn(&PartialResult) -> Option<String>,
    {
        let groups = self.group(extract);
        if groups.len() <= 1 {
            return groups.into_iter().next().map(|g| g.value);
        }

        let top_count = groups.iter().map(|g| g.contributors.len()).max().unwrap_or(0);
        let tied: Vec<&Group<String>> = groups.iter().filter(|g| g.contributors.len() == top_count).collect();
        let (chosen, reason) = if tied.len() == 1 {
            (tied[0].value.clone(), MergeReason::MajorityVote)
        } else {
            (tied[most_trusted(&tied)].value.clone(), MergeReason::HighestTrust)
        };

        self.report(field, groups, Value::from(chosen.clone()), reason);
        Some(chosen)
    }

    fn coordinates(&mut self) -> (Option<f64>, Option<f64>) {
        let pairs: Vec<(Source<'a>, f64, f64)> = self
            .sources
            .iter()
            .filter_map(|s| s.result.coordinates().map(|(lat, lon)| (*s, lat, lon)))
            .collect();
        if pairs.is_empty() {
            return (None, None);
        }

        let count = pairs.len() as f64;
        let latitude = round_coordinate(pairs.iter().map(|(_, lat, _)| lat).sum::<f64>() / count);
        let longitude = round_coordinate(pairs.iter().map(|(_, _, lon)| lon).sum::<f64>() / count);

        // Only complete pairs vote on either axis
        let paired = FieldMerger::new(pairs.iter().map(|(s, _, _)| *s).collect());
        let lat_groups = paired.group(|r| r.coordinates().map(|(lat, _)| lat));
        let lon_groups = paired.group(|r| r.coordinates().map(|(_, lon)| lon));
        if lat_groups.len() > 1 {
            self.report("latitude", lat_groups, Value::from(latitude), MergeReason::Average);
        }
        if lon_groups.len() > 1 {
            self.report("longitude", lon_groups, Value::from(longitude), MergeReason::Average);
        }

        (Some(latitude), Some(longitude))
    }

    fn flag<F>(&mut self, field: &str, extract: F) -> Option<bool>
    where
        F: Fn(&PartialResult) -> Option<bool>,
    {
        let groups = self.group(extract);
        if groups.is_empty() {
            return None;
        }
        let merged = groups.iter().any(|g| g.value);
        if groups.len() > 1 {
            self.report(field, groups, Value::from(merged), MergeReason::BooleanUnion);
        }
        Some(merged)
    }

    fn vpn_provider(&mut self) -> Option<String> {
        let groups = self.group(|r| match r.is_vpn {
            Some(true) => r.vpn_provider.clone(),
            _ => None,
        });
        if groups.is_empty() {
            return None;
        }

        let refs: Vec<&Group<String>> = groups.iter().collect();
        let chosen = refs[most_trusted(&refs)].value.clone();
        if groups.len() > 1 {
            self.report("vpnProvider", groups, Value::from(chosen.clone()), MergeReason::HighestTrust);
        }
        Some(chosen)
    }

    fn abuse_score(&mut self) -> Option<u8> {
        let groups = self.group(|r| r.abuse_score);
        let maximum = groups.iter().map(|g| g.value).max()?;
        if groups.len() > 1 {
            self.report("abuseScore", groups, Value::from(maximum), MergeReason::Maximum);
        }
        Some(maximum)
    }
}

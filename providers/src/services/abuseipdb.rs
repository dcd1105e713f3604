//! AbuseIPDB adapter
//!
//! Dedicated abuse database: abuse confidence score, Tor detection and the
//! last time the address was reported. Requires an API key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

use shared::{CancellationSignal, PartialResult, ProviderFailure, ProviderId};
use crate::error::ProviderResult;
use crate::services::http::{self, build_client, classify_status, join_path, send_json, str_field};
use crate::traits::ProviderAdapter;
use crate::types::AdapterSettings;

pub const ABUSEIPDB_ID: &str = "abuseipdb";
const DEFAULT_BASE_URL: &str = "https://api.abuseipdb.com/";
const MAX_AGE_DAYS: &str = "90";

pub struct AbuseIpDbAdapter {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl AbuseIpDbAdapter {
    pub fn new(settings: &AdapterSettings) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            base_url: http::resolve_base_url(ABUSEIPDB_ID, settings.base_url.as_ref(), DEFAULT_BASE_URL)?,
            api_key: settings.api_key.clone(),
        })
    }

    fn vendor_error(body: &Value) -> Option<ProviderFailure> {
        let first = body.get("errors")?.as_array()?.first()?;
        let detail = str_field(first, "detail").unwrap_or_else(|| first.to_string());
        Some(ProviderFailure::VendorError(detail))
    }

    fn parse(body: &Value) -> Result<PartialResult, ProviderFailure> {
        if let Some(failure) = Self::vendor_error(body) {
            return Err(failure);
        }
        let data = body
            .get("data")
            .ok_or_else(|| ProviderFailure::MalformedResponse("missing data object".to_string()))?;

        let usage_type = str_field(data, "usageType");
        let abuse_score = data
            .get("abuseConfidenceScore")
            .and_then(|v| v.as_u64())
            .map(|score| score.min(100) as u8);

        Ok(PartialResult {
            country: str_field(data, "countryCode").as_deref().and_then(http::country_code),
            org: str_field(data, "isp"),
            is_tor: data.get("isTor").and_then(|v| v.as_bool()),
            is_hosting: usage_type.as_deref().map(|u| u.contains("Data Center")),
            is_mobile: usage_type.as_deref().map(|u| u.contains("Mobile")),
            abuse_score,
            last_seen: str_field(data, "lastReportedAt")
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            raw: Some(body.clone()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ProviderAdapter for AbuseIpDbAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::new(ABUSEIPDB_ID)
    }

    async fn lookup(&self, ip: &str, cancel: &CancellationSignal) -> Result<PartialResult, ProviderFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderFailure::NotConfigured("ABUSEIPDB_API_KEY is not set".to_string()))?;

        let mut url = join_path(&self.base_url, &["api", "v2", "check"])?;
        url.query_pairs_mut()
            .append_pair("ipAddress", ip)
            .append_pair("maxAgeInDays", MAX_AGE_DAYS);

        let request = self
            .client
            .get(url)
            .header("Key", api_key)
            .header("Accept", "application/json");

        let response = send_json(request, cancel).await?;
        if let Some(failure) = classify_status(response.status) {
            // 4xx validation errors carry the vendor's own explanation
            return Err(match failure {
                ProviderFailure::HttpStatus(_) => response.body.as_ref().and_then(Self::vendor_error).unwrap_or(failure),
                other => other,
            });
        }
        let body = response
            .body
            .ok_or_else(|| ProviderFailure::MalformedResponse("empty body".to_string()))?;

        Self::parse(&body)
    }
}

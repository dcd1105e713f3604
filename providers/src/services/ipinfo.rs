//! ipinfo.io adapter
//!
//! Supplies ASN/org, geolocation, timezone and, on plans that include it, the
//! privacy detection block (vpn/proxy/tor/hosting plus the VPN service name).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use shared::{CancellationSignal, PartialResult, ProviderFailure, ProviderId};
use crate::error::ProviderResult;
use crate::services::http::{self, build_client, classify_status, join_path, send_json, str_field};
use crate::traits::ProviderAdapter;
use crate::types::AdapterSettings;

pub const IPINFO_ID: &str = "ipinfo";
const DEFAULT_BASE_URL: &str = "https://ipinfo.io/";

pub struct IpInfoAdapter {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl IpInfoAdapter {
    pub fn new(settings: &AdapterSettings) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            base_url: http::resolve_base_url(IPINFO_ID, settings.base_url.as_ref(), DEFAULT_BASE_URL)?,
            api_key: settings.api_key.clone(),
        })
    }

    fn parse(body: &Value) -> Result<PartialResult, ProviderFailure> {
        if let Some(error) = body.get("error") {
            let message = str_field(error, "message")
                .or_else(|| str_field(error, "title"))
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderFailure::VendorError(message));
        }

        if body.get("bogon").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(PartialResult::default());
        }

        let org_field = str_field(body, "org");
        let (latitude, longitude) = str_field(body, "loc")
            .as_deref()
            .and_then(parse_loc)
            .map(|(lat, lon)| (Some(lat), Some(lon)))
            .unwrap_or((None, None));

        let privacy = body.get("privacy");
        let flag = |key: &str| privacy.and_then(|p| p.get(key)).and_then(|v| v.as_bool());
        let is_vpn = flag("vpn");

        Ok(PartialResult {
            asn: org_field.as_deref().and_then(http::normalize_asn),
            org: org_field.as_deref().and_then(http::org_from_as_string),
            country: str_field(body, "country").as_deref().and_then(http::country_code),
            region: str_field(body, "region"),
            city: str_field(body, "city"),
            latitude,
            longitude,
            timezone: str_field(body, "timezone"),
            is_proxy: flag("proxy"),
            is_vpn,
            is_tor: flag("tor"),
            is_hosting: flag("hosting"),
            vpn_provider: if is_vpn == Some(true) {
                privacy.and_then(|p| str_field(p, "service"))
            } else {
                None
            },
            raw: Some(body.clone()),
            ..Default::default()
        })
    }
}

/// Split ipinfo's "37.3860,-122.0838" location string
fn parse_loc(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

#[async_trait]
impl ProviderAdapter for IpInfoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::new(IPINFO_ID)
    }

    async fn lookup(&self, ip: &str, cancel: &CancellationSignal) -> Result<PartialResult, ProviderFailure> {
        let url = join_path(&self.base_url, &[ip])?;
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = &self.api_key {
            request = request.bearer_auth(token);
        }

        let response = send_json(request, cancel).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(PartialResult::default());
        }
        if let Some(failure) = classify_status(response.status) {
            return Err(failure);
        }
        let body = response
            .body
            .ok_or_else(|| ProviderFailure::MalformedResponse("empty body".to_string()))?;

        Self::parse(&body)
    }
}

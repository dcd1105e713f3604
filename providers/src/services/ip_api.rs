//! ip-api.com geolocation adapter
//!
//! Free JSON endpoint; no key needed. Supplies geolocation, ASN/org and the
//! proxy/hosting/mobile detectors.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use shared::{CancellationSignal, PartialResult, ProviderFailure, ProviderId};
use crate::error::ProviderResult;
use crate::services::http::{self, build_client, classify_status, join_path, send_json, str_field};
use crate::traits::ProviderAdapter;
use crate::types::AdapterSettings;

pub const IP_API_ID: &str = "ip-api";
const DEFAULT_BASE_URL: &str = "http://ip-api.com/";
const FIELDS: &str = "status,message,countryCode,regionName,city,lat,lon,timezone,isp,org,as,proxy,hosting,mobile";

pub struct IpApiAdapter {
    client: reqwest::Client,
    base_url: Url,
}

impl IpApiAdapter {
    pub fn new(settings: &AdapterSettings) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            base_url: http::resolve_base_url(IP_API_ID, settings.base_url.as_ref(), DEFAULT_BASE_URL)?,
        })
    }

    fn parse(body: &Value) -> Result<PartialResult, ProviderFailure> {
        match body.get("status").and_then(|s| s.as_str()) {
            Some("success") => {}
            Some("fail") => {
                let message = str_field(body, "message").unwrap_or_else(|| "unknown failure".to_string());
                // Reserved ranges carry no data; anything else is a vendor-side error
                if message.contains("private range") || message.contains("reserved range") {
                    return Ok(PartialResult::default());
                }
                return Err(ProviderFailure::VendorError(message));
            }
            _ => return Err(ProviderFailure::MalformedResponse("missing status field".to_string())),
        }

        let as_field = str_field(body, "as");
        Ok(PartialResult {
            asn: as_field.as_deref().and_then(http::normalize_asn),
            org: str_field(body, "org")
                .or_else(|| str_field(body, "isp"))
                .or_else(|| as_field.as_deref().and_then(http::org_from_as_string)),
            country: str_field(body, "countryCode").as_deref().and_then(http::country_code),
            region: str_field(body, "regionName"),
            city: str_field(body, "city"),
            latitude: body.get("lat").and_then(|v| v.as_f64()),
            longitude: body.get("lon").and_then(|v| v.as_f64()),
            timezone: str_field(body, "timezone"),
            is_proxy: body.get("proxy").and_then(|v| v.as_bool()),
            is_hosting: body.get("hosting").and_then(|v| v.as_bool()),
            is_mobile: body.get("mobile").and_then(|v| v.as_bool()),
            raw: Some(body.clone()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ProviderAdapter for IpApiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::new(IP_API_ID)
    }

    async fn lookup(&self, ip: &str, cancel: &CancellationSignal) -> Result<PartialResult, ProviderFailure> {
        let mut url = join_path(&self.base_url, &["json", ip])?;
        url.query_pairs_mut().append_pair("fields", FIELDS);

        let response = send_json(self.client.get(url), cancel).await?;
        if let Some(failure) = classify_status(response.status) {
            return Err(failure);
        }
        let body = response
            .body
            .ok_or_else(|| ProviderFailure::MalformedResponse("empty body".to_string()))?;

        Self::parse(&body)
    }
}

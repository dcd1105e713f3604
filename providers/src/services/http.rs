//! HTTP plumbing shared by the vendor adapters

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use shared::{CancellationSignal, ProviderFailure};
use crate::error::{ProviderError, ProviderResult};

const USER_AGENT: &str = concat!("ipintel/", env!("CARGO_PKG_VERSION"));

/// Build a client with the adapter's own timeout as an upper bound
pub fn build_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Resolve the configured endpoint or fall back to the vendor default
pub fn resolve_base_url(provider: &str, configured: Option<&Url>, default: &str) -> ProviderResult<Url> {
    match configured {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| ProviderError::InvalidBaseUrl {
            provider: provider.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Append path segments to a base URL without dropping any base path
pub fn join_path(base: &Url, segments: &[&str]) -> Result<Url, ProviderFailure> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProviderFailure::NotConfigured(format!("base URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map non-success statuses onto the failure taxonomy
pub fn classify_status(status: StatusCode) -> Option<ProviderFailure> {
    if status.is_success() {
        return None;
    }
    let failure = match status.as_u16() {
        401 | 403 => ProviderFailure::AuthenticationFailed,
        429 => ProviderFailure::RateLimited,
        408 | 504 => ProviderFailure::Timeout,
        code => ProviderFailure::HttpStatus(code),
    };
    debug!(status = status.as_u16(), %failure, "Vendor status mapped to failure");
    Some(failure)
}

fn map_transport_error(error: reqwest::Error) -> ProviderFailure {
    debug!(error = %error, "Vendor request failed");
    if error.is_timeout() {
        ProviderFailure::Timeout
    } else {
        ProviderFailure::Network(error.to_string())
    }
}

/// Raw vendor response: status plus parsed JSON body (if any)
#[derive(Debug)]
pub struct JsonResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

/// Send a request and parse its JSON body, racing against the cancellation signal
///
/// Status classification is left to the caller so vendors that answer "not
/// found" with a 404 can map it to an empty result.
pub async fn send_json(request: RequestBuilder, cancel: &CancellationSignal) -> Result<JsonResponse, ProviderFailure> {
    if cancel.is_cancelled() {
        return Err(cancel.failure());
    }

    let exchange = async {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let body = if bytes.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Some(value),
                Err(e) if status.is_success() => {
                    debug!(status = status.as_u16(), error = %e, "Vendor returned malformed JSON");
                    return Err(ProviderFailure::MalformedResponse(format!("Failed to parse response: {e}")));
                }
                Err(_) => None,
            }
        };
        Ok(JsonResponse { status, body })
    };

    tokio::select! {
        result = exchange => result,
        _ = cancel.cancelled() => {
            debug!("Vendor request abandoned on cancellation");
            Err(cancel.failure())
        }
    }
}

/// Normalize "AS15169 Google LLC", "as15169" or "15169" to "AS15169"
pub fn normalize_asn(raw: &str) -> Option<String> {
    let token = raw.split_whitespace().next()?;
    let digits = token
        .strip_prefix("AS")
        .or_else(|| token.strip_prefix("as"))
        .or_else(|| token.strip_prefix("As"))
        .unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let number: u32 = digits.parse().ok()?;
    Some(format!("AS{number}"))
}

/// Organization part of "AS15169 Google LLC"
pub fn org_from_as_string(raw: &str) -> Option<String> {
    let mut parts = raw.splitn(2, char::is_whitespace);
    let first = parts.next()?;
    if normalize_asn(first).is_none() {
        return non_empty(raw);
    }
    parts.next().and_then(non_empty)
}

/// Trimmed, non-empty string or `None`
pub fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Uppercased two-letter country code or `None`
pub fn country_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

/// String field from a JSON object, trimmed and non-empty
pub fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).and_then(non_empty)
}

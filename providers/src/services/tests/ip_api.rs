//! Tests for the ip-api.com adapter

use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::{CancellationSignal, ProviderFailure};
use super::{mock_settings, patient_signal};
use crate::services::ip_api::IpApiAdapter;
use crate::traits::ProviderAdapter;

fn google_dns_body() -> serde_json::Value {
    json!({
        "status": "success",
        "countryCode": "US",
        "regionName": "Virginia",
        "city": "Ashburn",
        "lat": 39.03,
        "lon": -77.5,
        "timezone": "America/New_York",
        "isp": "Google LLC",
        "org": "Google Public DNS",
        "as": "AS15169 Google LLC",
        "proxy": false,
        "hosting": true,
        "mobile": false
    })
}

#[tokio::test]
async fn test_successful_lookup_maps_all_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/8.8.8.8"))
        .and(query_param(
            "fields",
            "status,message,countryCode,regionName,city,lat,lon,timezone,isp,org,as,proxy,hosting,mobile",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_dns_body()))
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let result = assert_ok!(adapter.lookup("8.8.8.8", &patient_signal()).await);

    assert_eq!(result.asn.as_deref(), Some("AS15169"));
    assert_eq!(result.org.as_deref(), Some("Google Public DNS"));
    assert_eq!(result.country.as_deref(), Some("US"));
    assert_eq!(result.region.as_deref(), Some("Virginia"));
    assert_eq!(result.city.as_deref(), Some("Ashburn"));
    assert_eq!(result.coordinates(), Some((39.03, -77.5)));
    assert_eq!(result.timezone.as_deref(), Some("America/New_York"));
    assert_eq!(result.is_proxy, Some(false));
    assert_eq!(result.is_hosting, Some(true));
    assert_eq!(result.is_mobile, Some(false));
    // ip-api has no opinion on these
    assert_eq!(result.is_vpn, None);
    assert_eq!(result.is_tor, None);
    assert_eq!(result.abuse_score, None);
    assert!(result.raw.is_some());
}

#[tokio::test]
async fn test_reserved_range_answer_is_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/10.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "fail",
            "message": "private range"
        })))
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let result = assert_ok!(adapter.lookup("10.0.0.1", &patient_signal()).await);
    assert!(!result.has_data());
}

#[tokio::test]
async fn test_vendor_failure_message_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "fail",
            "message": "invalid query"
        })))
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let failure = assert_err!(adapter.lookup("8.8.8.8", &patient_signal()).await);
    assert_eq!(failure, ProviderFailure::VendorError("invalid query".to_string()));
}

#[tokio::test]
async fn test_rate_limit_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let failure = assert_err!(adapter.lookup("8.8.8.8", &patient_signal()).await);
    assert_eq!(failure, ProviderFailure::RateLimited);
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let failure = assert_err!(adapter.lookup("8.8.8.8", &patient_signal()).await);
    assert!(matches!(failure, ProviderFailure::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_vendor_respects_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(google_dns_body())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let signal = CancellationSignal::new(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let failure = assert_err!(adapter.lookup("8.8.8.8", &signal).await);

    assert_eq!(failure, ProviderFailure::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_already_cancelled_signal_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_dns_body()))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = IpApiAdapter::new(&mock_settings(&server)).unwrap();
    let signal = patient_signal();
    signal.cancel();

    let failure = assert_err!(adapter.lookup("8.8.8.8", &signal).await);
    assert_eq!(failure, ProviderFailure::Cancelled);
}

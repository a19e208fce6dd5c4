//! Integration tests for OpenMeteoClient against a mock HTTP server.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxtrack_core::{Coordinates, WeatherProvider};
use wxtrack_provider::{OpenMeteoClient, OpenMeteoConfig, ProviderError, RetryConfig};

fn client_for(server: &MockServer, cache_ttl: Duration) -> OpenMeteoClient {
    OpenMeteoClient::new(OpenMeteoConfig {
        base_url: format!("{}/v1/forecast", server.uri()),
        request_timeout: Duration::from_secs(2),
        call_timeout: Duration::from_secs(5),
        cache_ttl,
        retry: RetryConfig::new(5, 1, 5),
    })
    .unwrap()
}

fn london() -> Coordinates {
    Coordinates::new(51.5074, -0.1278).unwrap()
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "latitude": 51.5,
        "longitude": -0.12,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "current": {
            "time": "2024-01-01T00:00",
            "interval": 900,
            "temperature_2m": 9.1,
            "surface_pressure": 1013.0,
            "wind_speed_10m": 4.2
        }
    })
}

#[tokio::test]
async fn test_current_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current", "temperature_2m,surface_pressure,wind_speed_10m"))
        .and(query_param("timezone", "GMT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::ZERO);
    let current = client.current(london()).await.unwrap();

    assert_eq!(current.get("temperature_2m"), Some(&9.1));
    assert_eq!(current.get("surface_pressure"), Some(&1013.0));
    assert_eq!(current.get("wind_speed_10m"), Some(&4.2));
}

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::ZERO);
    let current = client.current(london()).await.unwrap();
    assert_eq!(current.len(), 3);
}

#[tokio::test]
async fn test_exhausted_retry_budget_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(6)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::ZERO);
    let err = client.current(london()).await.unwrap_err();

    match err {
        ProviderError::Status { status, reason } => {
            assert_eq!(status, 500);
            assert_eq!(reason, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": true,
            "reason": "Cannot initialize WeatherVariable from invalid String value bogus"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::ZERO);
    let err = client
        .hourly(london(), &["bogus".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Status { status: 400, .. }));
    assert!(err.to_string().contains("invalid String value bogus"));
}

#[tokio::test]
async fn test_fresh_responses_come_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(3600));
    let first = client.current(london()).await.unwrap();
    let second = client.clone().current(london()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.cache().len().await, 1);
}

#[tokio::test]
async fn test_error_responses_are_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(3600));
    assert!(client.current(london()).await.is_err());
    assert!(client.current(london()).await.is_err());
    assert_eq!(client.cache().len().await, 0);
}

#[tokio::test]
async fn test_slow_provider_hits_call_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(OpenMeteoConfig {
        base_url: format!("{}/v1/forecast", server.uri()),
        request_timeout: Duration::from_secs(5),
        call_timeout: Duration::from_millis(200),
        cache_ttl: Duration::ZERO,
        retry: RetryConfig::new(0, 1, 1),
    })
    .unwrap();

    let err = client.current(london()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
}

#[tokio::test]
async fn test_hourly_through_provider_trait() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("hourly", "temperature_2m,wind_speed_10m"))
        .and(query_param("timeformat", "unixtime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "utc_offset_seconds": 0,
            "hourly": {
                "time": [1704067200, 1704070800, 1704074400, 1704078000],
                "temperature_2m": [1.0, 2.0, 3.0, 4.0],
                "wind_speed_10m": [10.0, 11.0, 12.0, 13.0]
            }
        })))
        .mount(&server)
        .await;

    let provider: Box<dyn WeatherProvider> = Box::new(client_for(&server, Duration::ZERO));
    let variables = vec!["temperature_2m".to_string(), "wind_speed_10m".to_string()];
    let forecast = provider.fetch_hourly(london(), &variables).await.unwrap();

    assert_eq!(forecast.grid.len(), 4);
    assert_eq!(forecast.samples("wind_speed_10m").map(<[_]>::len), Some(4));
}

#[tokio::test]
async fn test_provider_trait_error_carries_context() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider: Box<dyn WeatherProvider> = Box::new(client_for(&server, Duration::ZERO));
    let err = provider.fetch_current(london()).await.unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains("current weather request"));
    assert!(message.contains("status 404"));
}

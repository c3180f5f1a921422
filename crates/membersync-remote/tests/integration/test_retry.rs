//! Retry boundary tests
//!
//! Server errors (5xx) are retried up to the configured maximum with
//! exponential backoff; client errors (4xx) and network failures are not.

use std::time::Duration;

use reqwest::Method;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use membersync_core::domain::RemoteError;
use membersync_remote::{RemoteClient, RemoteClientConfig};

use crate::common::{setup_client, TEST_RETRY_BASE};

#[tokio::test]
async fn test_503_retried_until_exhaustion() {
    let (server, client) = setup_client().await;

    // 1 initial attempt + 3 retries = 4 requests
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client
        .request_with_retry(Method::GET, "/members", None)
        .await
        .unwrap_err();

    match err {
        RemoteError::Status { status, .. } => assert_eq!(status, 503),
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_503_then_success_recovers() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = client
        .request_with_retry(Method::GET, "/members", None)
        .await
        .unwrap();

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body["Items"], serde_json::json!([]));
}

#[tokio::test]
async fn test_400_never_retried() {
    let (server, client) = setup_client().await;

    Mock::given(method("POST"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(400).set_body_string("validation failed"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .request_with_retry(Method::POST, "/members", Some(&serde_json::json!({})))
        .await
        .unwrap_err();

    match err {
        RemoteError::Status { status, details } => {
            assert_eq!(status, 400);
            assert!(details.contains("validation failed"));
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_404_propagates_immediately() {
    let (server, client) = setup_client().await;

    Mock::given(method("PUT"))
        .and(path("/members/77"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .request_with_retry(Method::PUT, "/members/77", Some(&serde_json::json!({})))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_network_error_not_retried() {
    // Nothing is listening on this port
    let config = RemoteClientConfig::new("http://127.0.0.1:1")
        .with_retry_base(TEST_RETRY_BASE)
        .with_timeout(Duration::from_secs(1));
    let client = RemoteClient::new(config).unwrap();

    let err = client
        .request_with_retry(Method::GET, "/members", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RemoteError::Network(_) | RemoteError::Timeout
    ));
}

#[tokio::test]
async fn test_timeout_maps_to_typed_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = RemoteClientConfig::new(server.uri())
        .with_retry_base(TEST_RETRY_BASE)
        .with_timeout(Duration::from_millis(50));
    let client = RemoteClient::new(config).unwrap();

    let err = client
        .request(Method::GET, "/members", None)
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::Timeout);
}

#[tokio::test]
async fn test_auth_header_sent() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(wiremock::matchers::header(
            "authorization",
            "Bearer test-api-key",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client
        .request(Method::GET, "/members", None)
        .await
        .unwrap();
}

//! IRemoteSystem adapter tests
//!
//! Endpoint mapping, identifier extraction, envelope tolerance, and error
//! classification as seen by the reconciliation driver.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use membersync_core::domain::RemoteError;
use membersync_core::ports::IRemoteSystem;

use crate::common::setup_system;

#[tokio::test]
async fn test_create_posts_payload_and_extracts_id() {
    let (server, system) = setup_system().await;

    let payload = json!({"name": "Alice", "email": "alice@example.com"});
    Mock::given(method("POST"))
        .and(path("/members"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": 4711})))
        .expect(1)
        .mount(&server)
        .await;

    let remote_id = system.create(&payload).await.unwrap();
    assert_eq!(remote_id.as_str(), "4711");
}

#[tokio::test]
async fn test_create_conflict_is_classified() {
    let (server, system) = setup_system().await;

    Mock::given(method("POST"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate"))
        .mount(&server)
        .await;

    let err = system.create(&json!({})).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_create_400_already_exists_is_conflict() {
    let (server, system) = setup_system().await;

    Mock::given(method("POST"))
        .and(path("/members"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "A member with this email already exists"})),
        )
        .mount(&server)
        .await;

    let err = system.create(&json!({})).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_update_hits_entity_path() {
    let (server, system) = setup_system().await;

    Mock::given(method("PUT"))
        .and(path("/members/abc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "abc-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = "abc-1".parse().unwrap();
    system.update(&id, &json!({"name": "Alicia"})).await.unwrap();
}

#[tokio::test]
async fn test_update_404_signals_not_found() {
    let (server, system) = setup_system().await;

    Mock::given(method("PUT"))
        .and(path("/members/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = "gone".parse().unwrap();
    let err = system.update(&id, &json!({})).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_404_signals_not_found() {
    let (server, system) = setup_system().await;

    Mock::given(method("DELETE"))
        .and(path("/members/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = "gone".parse().unwrap();
    let err = system.delete(&id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_find_by_secondary_key_items_shape() {
    let (server, system) = setup_system().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(query_param("email", "alice@example.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Items": [{"Id": 99}]})),
        )
        .mount(&server)
        .await;

    let found = system
        .find_by_secondary_key("alice@example.com")
        .await
        .unwrap();
    assert_eq!(found.unwrap().as_str(), "99");
}

#[tokio::test]
async fn test_find_by_secondary_key_alternate_shapes() {
    for body in [
        json!({"Results": [{"id": "r-1"}]}),
        json!({"Data": [{"Id": "r-1"}]}),
        json!([{"Id": "r-1"}]),
    ] {
        let (server, system) = setup_system().await;

        Mock::given(method("GET"))
            .and(path("/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let found = system.find_by_secondary_key("x@example.com").await.unwrap();
        assert_eq!(found.unwrap().as_str(), "r-1");
    }
}

#[tokio::test]
async fn test_find_by_secondary_key_no_match() {
    let (server, system) = setup_system().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": []})))
        .mount(&server)
        .await;

    let found = system.find_by_secondary_key("nobody@example.com").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_by_secondary_key_unrecognized_shape() {
    let (server, system) = setup_system().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Rows": []})))
        .mount(&server)
        .await;

    let err = system
        .find_by_secondary_key("x@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::UnrecognizedShape(_)));
}

#[tokio::test]
async fn test_secondary_key_is_url_encoded() {
    let (server, system) = setup_system().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(query_param("email", "a+b@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": []})))
        .expect(1)
        .mount(&server)
        .await;

    system
        .find_by_secondary_key("a+b@example.com")
        .await
        .unwrap();
}

#![allow(clippy::unwrap_used)]
// Integration tests for `NbiClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use acsparam_api::{BasicAuth, Error, NbiClient, TaskOptions, TaskStatus};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NbiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = NbiClient::with_client(reqwest::Client::new(), base_url, None);
    (server, client)
}

fn quiet() -> TaskOptions {
    TaskOptions {
        connection_request: false,
        timeout: None,
    }
}

// ── Submission ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_task_completed() {
    let (server, client) = setup().await;
    let body = json!({ "name": "addObject", "objectName": "Device.WiFi.SSID" });

    Mock::given(method("POST"))
        .and(path("/devices/00259E-X-0000/tasks"))
        .and(query_param("connection_request", ""))
        .and(query_param("timeout", "3000"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let status = client
        .post_task("00259E-X-0000", &body, &TaskOptions::default())
        .await
        .unwrap();
    assert_eq!(status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_post_task_queued_when_device_offline() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/ABC/tasks"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let options = TaskOptions {
        connection_request: true,
        timeout: Some(Duration::from_millis(500)),
    };
    let status = client
        .post_task("ABC", &json!({ "name": "getParameterValues" }), &options)
        .await
        .unwrap();
    assert_eq!(status, TaskStatus::Queued);
}

#[tokio::test]
async fn test_post_task_encodes_device_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/A%20B/tasks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .post_task("A B", &json!({ "name": "deleteObject" }), &quiet())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_post_task_sends_basic_auth() {
    let server = MockServer::start().await;
    let client = NbiClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Some(BasicAuth {
            username: "admin".into(),
            password: "s3cret".to_string().into(),
        }),
    );

    Mock::given(method("POST"))
        .and(basic_auth("admin", "s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .post_task("ABC", &json!({ "name": "addObject" }), &quiet())
        .await
        .unwrap();
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_task_unknown_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No such device"))
        .mount(&server)
        .await;

    let result = client
        .post_task("missing", &json!({ "name": "addObject" }), &quiet())
        .await;

    assert!(
        matches!(result, Err(Error::DeviceNotFound { ref device_id }) if device_id == "missing"),
        "expected DeviceNotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_post_task_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client
        .post_task("ABC", &json!({ "name": "addObject" }), &quiet())
        .await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_post_task_server_error_carries_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid task\n"))
        .mount(&server)
        .await;

    let err = client
        .post_task("ABC", &json!({ "name": "bogus" }), &quiet())
        .await
        .unwrap_err();

    match err {
        Error::Nbi { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid task");
        }
        other => panic!("expected Nbi error, got: {other:?}"),
    }
}

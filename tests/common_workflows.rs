//! Integration tests for common Tether workflows.
//!
//! These tests drive the facade crate the way applications use it.

use std::sync::Arc;
use std::time::Duration;
use tether::prelude::*;
use tether_testing::*;

// =============================================================================
// Client Setup
// =============================================================================

fn api(platform: Arc<MockPlatform>) -> Tether {
    Tether::new(
        RequestConfig::builder()
            .base_url("https://api.example.com/v1")
            .header("X-App", "demo")
            .timeout(Duration::from_secs(10))
            .platform(platform)
            .open_local_printer(false)
            .open_local_logger(false)
            .build(),
    )
}

// =============================================================================
// Request Workflows
// =============================================================================

#[tokio::test]
async fn test_authenticated_crud_workflow() {
    let platform = Arc::new(MockPlatform::new());
    let client = api(platform.clone());

    client.interceptors().request.add_fn(|mut config| async move {
        config.token = Some("session-token".into());
        Ok(config)
    });

    platform.script(Primitive::Request, Script::respond(201, r#"{"id":7}"#));
    let created = client
        .post("/items", Some(serde_json::json!({"name": "widget"})), None)
        .await
        .unwrap();
    assert_status(&created, 201);
    assert_json(&created, &serde_json::json!({"id": 7}));

    platform.script(Primitive::Request, Script::respond(200, r#"{"id":7,"name":"widget"}"#));
    let fetched = client
        .get(
            "/items",
            None,
            Some(RequestConfig::builder().params(7).build()),
        )
        .await
        .unwrap();
    assert_success(&fetched);

    let calls = platform.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].url(), "https://api.example.com/v1/items/7");
    match &calls[0] {
        RecordedCall::Request(options) => {
            assert_eq!(options.method, Method::POST);
            assert_eq!(options.header.get("Authorization").map(String::as_str), Some("Bearer session-token"));
            assert_eq!(options.header.get("X-App").map(String::as_str), Some("demo"));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_error_normalization_workflow() {
    let platform = Arc::new(MockPlatform::new());
    let client = api(platform.clone());

    client.interceptors().response.add_fn(|response| async move {
        if response.status_code == Some(401) {
            return Err(TetherError::Config("session expired".into()));
        }
        Ok(response)
    });

    platform.script(Primitive::Request, Script::respond(401, ""));
    let err = client.get("/me", None, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Configuration error: session expired");

    platform.script(Primitive::Request, Script::fail("request:fail timeout"));
    let err = client.get("/me", None, None).await.unwrap_err();
    assert_transport_error(&err, "timeout");
}

// =============================================================================
// File Transfer Workflows
// =============================================================================

#[tokio::test]
async fn test_upload_then_download_workflow() {
    let platform = Arc::new(MockPlatform::new());
    let client = api(platform.clone());

    platform.script(Primitive::Upload, Script::respond(200, r#"{"url":"/files/a.png"}"#));
    let uploaded = client
        .upload_file(("/files", "/tmp/a.png", "avatar"))
        .await
        .unwrap();
    assert_json(&uploaded, &serde_json::json!({"url": "/files/a.png"}));

    let downloaded = client
        .download_file(("/files/a.png", "/tmp/copy.png"))
        .await
        .unwrap();
    assert_success(&downloaded);

    let calls = platform.calls();
    assert_eq!(calls[0].primitive(), Primitive::Upload);
    assert_eq!(calls[1].primitive(), Primitive::Download);
    assert_eq!(calls[1].url(), "https://api.example.com/v1/files/a.png");
}

// =============================================================================
// Shared Defaults
// =============================================================================

#[tokio::test]
async fn test_derived_clients_share_defaults_not_interceptors() {
    let platform = Arc::new(MockPlatform::new());
    let client = api(platform.clone());
    client.interceptors().request.add_fn(|mut config| async move {
        config.header.set("X-Parent", "1");
        Ok(config)
    });

    let admin = client.create(RequestConfig::builder().header("X-Role", "admin").build());
    admin.get("/stats", None, None).await.unwrap();

    match platform.last_call() {
        Some(RecordedCall::Request(options)) => {
            assert_eq!(options.header.get("X-App").map(String::as_str), Some("demo"));
            assert_eq!(options.header.get("X-Role").map(String::as_str), Some("admin"));
            assert!(!options.header.contains_key("X-Parent"));
            assert_eq!(options.timeout, Some(Duration::from_secs(10)));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_requests() {
    let platform = Arc::new(MockPlatform::new());
    let client = api(platform.clone());

    let responses = Tether::all(vec![
        client.get("/a", None, None),
        client.get("/b", None, None),
        client.get("/c", None, None),
    ])
    .await
    .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(platform.call_count(), 3);
}

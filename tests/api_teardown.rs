//! HTTP tests for the teardown endpoint, API-key protection and health.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, test_config, TestHarness};
use liveops_core::ChannelState;
use liveops_teardown::testing::{Call, FakeMediaClient};

const ENDPOINT: &str = "/api/delete-live-event-output";

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn protected(key: &str) -> TestHarness {
    let mut config = test_config();
    config.server.api_key = Some(key.into());
    TestHarness::with_config(
        FakeMediaClient::new().with_channel("CH1", ChannelState::Stopped),
        config,
    )
}

// ---------------------------------------------------------------------------
// Teardown endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_tears_down_channel() {
    let h = TestHarness::new(
        FakeMediaClient::new()
            .with_channel("CH1", ChannelState::Running)
            .with_output("CH1", "out1", "a1")
            .with_locator("a1", "loc1", Some("CH1-custom-policy")),
    );

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "channelName": "CH1" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["channelName"], "CH1");
    assert_eq!(json["operationsVersion"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["warnings"], json!([]));
    assert_eq!(
        json["dependents"][0],
        json!({ "kind": "output", "name": "out1", "status": "deleted" })
    );
    assert!(h.media.calls().contains(&Call::DeletePolicy("CH1-custom-policy".into())));
}

#[tokio::test]
async fn get_reads_query_parameters() {
    let h = TestHarness::new(
        FakeMediaClient::new()
            .with_channel("CH1", ChannelState::Stopped)
            .with_output("CH1", "out1", "a1"),
    );

    let resp = h
        .router()
        .oneshot(get(&format!("{ENDPOINT}?channelName=CH1&deleteAsset=false")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.media.count(|c| matches!(c, Call::DeleteAsset(_))), 0);
    assert!(h.media.calls().contains(&Call::DeleteChannel("CH1".into())));
}

#[tokio::test]
async fn legacy_field_names_are_accepted() {
    let h = TestHarness::new(FakeMediaClient::new().with_channel("CH1", ChannelState::Stopped));

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "liveEventName": "CH1", "deleteAsset": true })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_channel_name_is_rejected() {
    let h = TestHarness::new(FakeMediaClient::new());

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "deleteAsset": true })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json = body_json(resp.into_body()).await;
    assert_eq!(
        json,
        json!({
            "success": false,
            "errorMessage": "Validation error: channelName is required"
        })
    );
    assert!(h.media.calls().is_empty());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let h = TestHarness::new(FakeMediaClient::new());

    let request = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = h.router().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(h.media.calls().is_empty());
}

#[tokio::test]
async fn unknown_channel_is_404() {
    let h = TestHarness::new(FakeMediaClient::new());

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "channelName": "CH1" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["errorMessage"], "live event not found: CH1");
    assert_eq!(json["failedStage"], "Discovering");
    assert!(h.media.mutations().is_empty());
}

#[tokio::test]
async fn fatal_remote_failure_is_502_with_progress() {
    let h = TestHarness::new(
        FakeMediaClient::new()
            .with_channel("CH1", ChannelState::Stopped)
            .with_output("CH1", "out1", "a1")
            .fail_on(Call::DeleteOutput("out1".into())),
    );

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "channelName": "CH1" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["failedStage"], "DeletingDependents");
    assert_eq!(json["dependents"][0]["status"], "failed");
    assert!(!h.media.calls().contains(&Call::DeleteChannel("CH1".into())));
}

// ---------------------------------------------------------------------------
// API key
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_key_required_when_configured() {
    let h = protected("secret");

    let resp = h
        .router()
        .oneshot(post(ENDPOINT, json!({ "channelName": "CH1" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["code"], "unauthorized");
    assert_eq!(json["error"], "Unauthorized: API key required");
    assert!(json["request_id"].is_string());
    assert!(h.media.calls().is_empty());
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let h = protected("secret");

    let request = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("x-functions-key", "nope")
        .body(Body::from(json!({ "channelName": "CH1" }).to_string()))
        .unwrap();
    let resp = h.router().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "Unauthorized: invalid API key");
}

#[tokio::test]
async fn api_key_accepted_from_header_query_or_bearer() {
    let h = protected("secret");

    let via_header = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("x-functions-key", "secret")
        .body(Body::from(json!({ "channelName": "CH1" }).to_string()))
        .unwrap();
    let resp = h.router().oneshot(via_header).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let h = protected("secret");
    let resp = h
        .router()
        .oneshot(get(&format!("{ENDPOINT}?channelName=CH1&code=secret")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let h = protected("secret");
    let via_bearer = Request::builder()
        .uri(format!("{ENDPOINT}?channelName=CH1"))
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let resp = h.router().oneshot(via_bearer).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Health, docs and request ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_open_even_with_api_key() {
    let h = protected("secret");

    let resp = h.router().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "fake");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = TestHarness::new(FakeMediaClient::new());

    let resp = h.router().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert!(json["paths"]["/api/delete-live-event-output"].is_object());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let h = TestHarness::new(FakeMediaClient::new());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let resp = h.router().oneshot(request).await.unwrap();
    assert_eq!(resp.headers()["x-request-id"], "req-42");

    let resp = h.router().oneshot(get("/health")).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn teardown_response_carries_request_id() {
    let h = TestHarness::new(FakeMediaClient::new().with_channel("CH1", ChannelState::Stopped));

    let request = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("x-request-id", "teardown-7")
        .body(Body::from(json!({ "channelName": "CH1" }).to_string()))
        .unwrap();
    let resp = h.router().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "teardown-7");
}

// ---------------------------------------------------------------------------
// Over a real socket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn served_teardown_over_http() {
    let (h, addr) =
        TestHarness::with_server(FakeMediaClient::new().with_channel("CH1", ChannelState::Stopped))
            .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}{ENDPOINT}"))
        .json(&json!({ "channelName": "CH1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(
        h.media.mutations(),
        vec![
            Call::DeleteChannel("CH1".into()),
            Call::DeleteMetadata("CH1".into()),
        ]
    );
}

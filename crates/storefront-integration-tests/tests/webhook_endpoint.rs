//! Integration tests for the webhook endpoint
//!
//! Each test drives the full router with `oneshot`, so routing, body limits,
//! middleware and the dispatcher are all exercised together.

mod common;

use axum::http::StatusCode;
use common::{
    body_text, build_app, signed_webhook, test_config, webhook_request, Behaviour,
    RecordingHandler, TEST_SECRET,
};
use serde_json::json;
use storefront_core::webhook::{generate_signature, generate_signature_for_bytes, SigningMode};
use tower::ServiceExt;

fn completed_event(order_id: &str) -> serde_json::Value {
    json!({
        "event_type": "checkout.session.completed",
        "data": {
            "session_id": "cs_1",
            "order_id": order_id,
            "amount_usd": 30,
            "status": "completed"
        }
    })
}

// ============================================================================
// Accepted deliveries
// ============================================================================

#[tokio::test]
async fn test_completed_payment_reaches_handler() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(signed_webhook(&completed_event("ord_42")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(
        handler.calls(),
        vec![(
            "checkout.session.completed".to_string(),
            Some("ord_42".to_string())
        )]
    );
}

#[tokio::test]
async fn test_failed_payment_reaches_handler() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let payload = json!({
        "event_type": "checkout.session.failed",
        "data": {"order_id": "ord_7", "status": "failed"}
    });

    let response = app.oneshot(signed_webhook(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(handler.calls()[0].0, "checkout.session.failed");
}

#[tokio::test]
async fn test_bare_hex_signature_is_accepted() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let payload = completed_event("ord_1");
    let signature = generate_signature(&payload, TEST_SECRET);

    let response = app
        .oneshot(webhook_request(
            serde_json::to_vec(&payload).unwrap(),
            Some(&signature),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(handler.call_count(), 1);
}

#[tokio::test]
async fn test_unrecognized_event_is_acknowledged_without_handler() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(signed_webhook(&json!({
            "event_type": "checkout.session.expired",
            "data": {"order_id": "ord_1"}
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_raw_mode_verifies_received_bytes() {
    let handler = RecordingHandler::new();
    let mut config = test_config();
    config.webhooks.signing_mode = SigningMode::Raw;
    let app = build_app(config, handler.clone());

    let body = b"{ \"event_type\" : \"checkout.session.completed\", \"data\" : {} }";
    let signature = format!("sha256={}", generate_signature_for_bytes(body, TEST_SECRET));

    let response = app
        .oneshot(webhook_request(body.to_vec(), Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(handler.call_count(), 1);
}

// ============================================================================
// Rejected deliveries
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_rejected_before_signature_check() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(webhook_request("{\"event_type\": ", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid JSON");
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_non_object_json_is_rejected() {
    let app = build_app(test_config(), RecordingHandler::new());

    let response = app
        .oneshot(webhook_request("[1, 2, 3]", Some("sha256=00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let body = serde_json::to_vec(&completed_event("ord_1")).unwrap();

    let response = app.oneshot(webhook_request(body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Invalid signature");
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_tampered_payload_is_unauthorized() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let signature = format!(
        "sha256={}",
        generate_signature(&completed_event("ord_1"), TEST_SECRET)
    );
    let tampered = serde_json::to_vec(&completed_event("ord_2")).unwrap();

    let response = app
        .oneshot(webhook_request(tampered, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_uppercased_signature_is_unauthorized() {
    let app = build_app(test_config(), RecordingHandler::new());
    let payload = completed_event("ord_1");
    let signature = generate_signature(&payload, TEST_SECRET).to_uppercase();

    let response = app
        .oneshot(webhook_request(
            serde_json::to_vec(&payload).unwrap(),
            Some(&signature),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_algorithm_tag_is_unauthorized() {
    let app = build_app(test_config(), RecordingHandler::new());
    let payload = completed_event("ord_1");
    let signature = format!("md5={}", generate_signature(&payload, TEST_SECRET));

    let response = app
        .oneshot(webhook_request(
            serde_json::to_vec(&payload).unwrap(),
            Some(&signature),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unconfigured_secret_rejects_every_delivery() {
    let handler = RecordingHandler::new();
    let mut config = test_config();
    config.webhooks.secret = Default::default();
    let app = build_app(config, handler.clone());

    let response = app
        .oneshot(signed_webhook(&completed_event("ord_1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_missing_event_type_is_server_error() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(signed_webhook(&json!({"data": {"order_id": "ord_1"}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal error");
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let handler = RecordingHandler::new();
    let mut config = test_config();
    config.server.max_body_size = 64;
    let app = build_app(config, handler.clone());
    let payload = json!({
        "event_type": "checkout.session.completed",
        "data": {"order_id": "x".repeat(256)}
    });

    let response = app.oneshot(signed_webhook(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(handler.call_count(), 0);
}

// ============================================================================
// Handler failures
// ============================================================================

#[tokio::test]
async fn test_handler_error_is_reported_for_retry() {
    let handler = RecordingHandler::with_behaviour(Behaviour::Fail);
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(signed_webhook(&completed_event("ord_1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal error");
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let handler = RecordingHandler::with_behaviour(Behaviour::Panic);
    let app = build_app(test_config(), handler.clone());

    let response = app
        .oneshot(signed_webhook(&completed_event("ord_1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal error");
}

#[tokio::test]
async fn test_service_keeps_serving_after_handler_panic() {
    let handler = RecordingHandler::with_behaviour(Behaviour::PanicOnce);
    let app = build_app(test_config(), handler.clone());

    let first = app
        .clone()
        .oneshot(signed_webhook(&completed_event("ord_1")))
        .await
        .unwrap();
    let second = app
        .oneshot(signed_webhook(&completed_event("ord_2")))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_text(second).await, "OK");
    assert_eq!(handler.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_handler_times_out() {
    let handler = RecordingHandler::with_behaviour(Behaviour::Sleep(
        std::time::Duration::from_secs(60),
    ));
    let mut config = test_config();
    config.webhooks.handler_timeout_seconds = 1;
    let app = build_app(config, handler.clone());

    let response = app
        .oneshot(signed_webhook(&completed_event("ord_1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(handler.call_count(), 1);
}

// ============================================================================
// Redelivery
// ============================================================================

#[tokio::test]
async fn test_redelivered_event_id_is_handled_once() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let mut payload = completed_event("ord_1");
    payload["id"] = json!("evt_1001");

    let first = app.clone().oneshot(signed_webhook(&payload)).await.unwrap();
    let second = app.oneshot(signed_webhook(&payload)).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(handler.call_count(), 1);
}

#[tokio::test]
async fn test_failed_event_is_retried_on_redelivery() {
    let handler = RecordingHandler::with_behaviour(Behaviour::Fail);
    let app = build_app(test_config(), handler.clone());
    let mut payload = completed_event("ord_1");
    payload["id"] = json!("evt_2002");

    app.clone().oneshot(signed_webhook(&payload)).await.unwrap();
    let retry = app.oneshot(signed_webhook(&payload)).await.unwrap();

    assert_eq!(retry.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(handler.call_count(), 2);
}

#[tokio::test]
async fn test_events_without_id_are_never_deduplicated() {
    let handler = RecordingHandler::new();
    let app = build_app(test_config(), handler.clone());
    let payload = completed_event("ord_1");

    app.clone().oneshot(signed_webhook(&payload)).await.unwrap();
    app.oneshot(signed_webhook(&payload)).await.unwrap();

    assert_eq!(handler.call_count(), 2);
}

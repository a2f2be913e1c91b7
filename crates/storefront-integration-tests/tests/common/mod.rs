//! Common test utilities for storefront-api integration tests
//!
//! This module provides:
//! - A recording [`PaymentEventHandler`] with configurable behaviour
//! - Helpers for building configured routers and signed requests

use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_api::{create_router, AppState, ServiceConfig};
use storefront_core::{
    webhook::{generate_signature, CheckoutSessionData, HandlerError, PaymentEventHandler},
    SecretValue,
};

pub const TEST_SECRET: &str = "whsec_integration_secret";
pub const WEBHOOK_PATH: &str = "/api/webhooks";
pub const SIGNATURE_HEADER: &str = "x-gamepoints-signature";

// ============================================================================
// Recording handler
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(dead_code)]
pub enum Behaviour {
    Succeed,
    Fail,
    Panic,
    /// Panic on the first call, succeed afterwards
    PanicOnce,
    Sleep(Duration),
}

/// Handler that records `(event_type, order_id)` for each call
#[derive(Clone)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
    behaviour: Behaviour,
    panicked: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Succeed)
    }

    pub fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behaviour,
            panicked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn record(&self, event_type: &str, data: &CheckoutSessionData) -> Result<(), HandlerError> {
        self.calls
            .lock()
            .unwrap()
            .push((event_type.to_string(), data.order_id.clone()));

        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err("fulfilment backend unavailable".into()),
            Behaviour::Panic => panic!("handler bug"),
            Behaviour::PanicOnce => {
                if !self.panicked.swap(true, Ordering::SeqCst) {
                    panic!("handler bug");
                }
                Ok(())
            }
            Behaviour::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[async_trait::async_trait]
impl PaymentEventHandler for RecordingHandler {
    async fn on_payment_completed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
        self.record("checkout.session.completed", data).await
    }

    async fn on_payment_failed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
        self.record("checkout.session.failed", data).await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Configuration with the test secret and everything else defaulted
#[allow(dead_code)]
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretValue::from(TEST_SECRET);
    config
}

#[allow(dead_code)]
pub fn build_app(config: ServiceConfig, handler: RecordingHandler) -> Router {
    let state = AppState::from_config(config, Arc::new(handler)).expect("state should build");
    create_router(state)
}

/// POST to the webhook route with an optional signature header
#[allow(dead_code)]
pub fn webhook_request(body: impl Into<Body>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(body.into()).unwrap()
}

/// Webhook request signed over the canonical serialization of `payload`
#[allow(dead_code)]
pub fn signed_webhook(payload: &Value) -> Request<Body> {
    let signature = format!("sha256={}", generate_signature(payload, TEST_SECRET));
    webhook_request(serde_json::to_vec(payload).unwrap(), Some(&signature))
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

//! Server-side proxy for creating checkout sessions.
//!
//! The browser posts the order to this service, which forwards it to the
//! payment provider's checkout API with the merchant API key attached. The
//! key never reaches the client.

use crate::config::CheckoutConfig;
use crate::errors::CheckoutProxyError;
use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use storefront_core::SecretValue;
use tracing::{debug, info, warn};

/// Header carrying the merchant API key upstream
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Upstream reply, relayed to the caller unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Forwards checkout-session requests to the upstream API.
pub struct CheckoutProxy {
    http_client: reqwest::Client,
    upstream_url: String,
    api_key: SecretValue,
}

impl CheckoutProxy {
    /// Build a proxy for the configured upstream.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutProxyError::Client`] if the HTTP client cannot be
    /// created.
    pub fn new(config: &CheckoutConfig, timeout: Duration) -> Result<Self, CheckoutProxyError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CheckoutProxyError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            upstream_url: config.upstream_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Upstream endpoint requests are forwarded to
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Forward a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutProxyError::InvalidRequest`] if `body` is not JSON.
    pub async fn forward_bytes(&self, body: &[u8]) -> Result<UpstreamResponse, CheckoutProxyError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|e| CheckoutProxyError::InvalidRequest {
                message: e.to_string(),
            })?;
        self.create_session(&payload).await
    }

    /// Create a checkout session upstream.
    ///
    /// Any upstream status is relayed. A JSON reply is passed through as-is;
    /// anything else is wrapped as `{"error": <text>}`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutProxyError::Upstream`] if the upstream cannot be
    /// reached or its body cannot be read.
    pub async fn create_session(
        &self,
        payload: &Value,
    ) -> Result<UpstreamResponse, CheckoutProxyError> {
        debug!(upstream = %self.upstream_url, "Forwarding checkout session request");

        let response = self
            .http_client
            .post(&self.upstream_url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|e| CheckoutProxyError::Upstream {
                message: e.to_string(),
            })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let text = response
            .text()
            .await
            .map_err(|e| CheckoutProxyError::Upstream {
                message: e.to_string(),
            })?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(json) => json,
            Err(_) => {
                warn!(status = %status, "Upstream checkout reply is not JSON");
                serde_json::json!({ "error": text })
            }
        };

        info!(status = %status, "Checkout session request relayed");
        Ok(UpstreamResponse { status, body })
    }
}

// Security: Don't expose the API key in debug output
impl std::fmt::Debug for CheckoutProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutProxy")
            .field("upstream_url", &self.upstream_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

#[cfg(test)]
#[path = "checkout_proxy_tests.rs"]
mod tests;

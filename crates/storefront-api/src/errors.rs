//! Error types for the HTTP service

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use storefront_core::webhook::{TerminalState, WebhookError};
use tracing::{error, warn};

/// Plain-text bodies the payment provider expects on webhook responses
pub mod webhook_body {
    pub const OK: &str = "OK";
    pub const INVALID_JSON: &str = "Invalid JSON";
    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const INTERNAL_ERROR: &str = "Internal error";
}

/// Webhook handler errors with HTTP status code mapping
///
/// Maps each processing failure onto the provider's contract:
///
/// - `400 Bad Request`: body is not a JSON object (not retried)
/// - `401 Unauthorized`: signature missing, wrong, or no secret configured
///   (not retried)
/// - `500 Internal Server Error`: event decoding, handler, or idempotency
///   failure (retried by the provider)
///
/// # Security Considerations
///
/// Response bodies are fixed strings. Detailed error information is logged
/// server-side with the request's correlation ID.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Webhook processing pipeline failure
    #[error("Processing failed: {0}")]
    ProcessingFailed(#[from] WebhookError),
}

impl WebhookHandlerError {
    /// HTTP status returned to the provider
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProcessingFailed(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Terminal state of the request, for metrics
    pub fn terminal_state(&self) -> TerminalState {
        match self {
            Self::ProcessingFailed(e) => e.terminal_state(),
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let state = self.terminal_state();
        let body = match state {
            TerminalState::RejectedBadRequest => {
                warn!(error = %self, "Rejected malformed webhook");
                webhook_body::INVALID_JSON
            }
            TerminalState::RejectedUnauthorized => {
                warn!(error = %self, "Rejected unauthenticated webhook");
                webhook_body::INVALID_SIGNATURE
            }
            TerminalState::RejectedServerError | TerminalState::Accepted => {
                error!(error = %self, "Webhook processing failed");
                webhook_body::INTERNAL_ERROR
            }
        };

        (
            self.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

/// Checkout proxy errors
#[derive(Debug, thiserror::Error)]
pub enum CheckoutProxyError {
    /// No `checkout` section in the configuration
    #[error("Checkout proxy is not configured")]
    NotConfigured,

    /// Caller's body was not JSON
    #[error("Invalid request body: {message}")]
    InvalidRequest { message: String },

    /// Upstream could not be reached or its response could not be read
    #[error("Upstream request failed: {message}")]
    Upstream { message: String },

    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {message}")]
    Client { message: String },
}

impl IntoResponse for CheckoutProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::NotConfigured => {
                error!("Checkout request received but the proxy is not configured");
                serde_json::json!({ "error": self.to_string() })
            }
            Self::InvalidRequest { message }
            | Self::Upstream { message }
            | Self::Client { message } => {
                error!(error = %self, "Checkout proxy error");
                serde_json::json!({ "error": "Proxy error", "detail": message })
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Loading(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

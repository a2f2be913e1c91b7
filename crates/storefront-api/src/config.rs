//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_core::webhook::SigningMode;
use storefront_core::SecretValue;

/// Default signature header sent by the payment provider
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-gamepoints-signature";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook intake settings
    pub webhooks: WebhookConfig,

    /// Checkout-session proxy; the route fails closed when absent
    pub checkout: Option<CheckoutConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check that the configuration can serve traffic.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the webhook secret is empty, and
    /// [`ConfigError::Invalid`] for any out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.webhooks.validate()?;
        if let Some(checkout) = &self.checkout {
            checkout.validate()?;
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Bound on each outbound call to the checkout upstream, in seconds.
    /// Inbound requests are not cut off by this value.
    pub upstream_timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
            enable_cors: true,
            enable_compression: true,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.upstream_timeout_seconds must be greater than zero".to_string(),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Timeout applied to the checkout upstream client
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Header carrying the signature (matched case-insensitively)
    pub signature_header: String,

    /// Which bytes the provider signs
    pub signing_mode: SigningMode,

    /// Upper bound on a single handler invocation
    pub handler_timeout_seconds: u64,

    /// How long processed event ids are remembered (0 = until restart)
    pub dedup_retention_seconds: u64,

    /// Shared signing secret; required, never defaulted
    #[serde(skip_serializing)]
    pub secret: SecretValue,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/api/webhooks".to_string(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            signing_mode: SigningMode::Canonical,
            handler_timeout_seconds: 10,
            dedup_retention_seconds: 24 * 60 * 60,
            secret: SecretValue::default(),
        }
    }
}

impl WebhookConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.secret".to_string(),
            });
        }
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must start with '/', got '{}'",
                    self.endpoint_path
                ),
            });
        }
        if axum::http::HeaderName::from_bytes(self.signature_header.as_bytes()).is_err() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.signature_header '{}' is not a valid header name",
                    self.signature_header
                ),
            });
        }
        if self.handler_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "webhooks.handler_timeout_seconds must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Handler timeout as a [`Duration`]
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_seconds)
    }

    /// Retention for processed event ids, `None` to keep them until restart
    pub fn dedup_retention(&self) -> Option<Duration> {
        match self.dedup_retention_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}

/// Upstream checkout API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Full URL of the upstream checkout-sessions endpoint
    #[serde(default)]
    pub upstream_url: String,

    /// Key sent upstream in `X-API-Key`
    #[serde(default, skip_serializing)]
    pub api_key: SecretValue,
}

impl CheckoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing {
                key: "checkout.api_key".to_string(),
            });
        }
        if self.upstream_url.is_empty() {
            return Err(ConfigError::Missing {
                key: "checkout.upstream_url".to_string(),
            });
        }
        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "checkout.upstream_url must be an http(s) URL, got '{}'",
                    self.upstream_url
                ),
            });
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

//! # Storefront Core
//!
//! Core logic for the storefront's payment webhook intake.
//!
//! This crate authenticates webhook deliveries from the payment provider with
//! HMAC-SHA256 signatures, decodes them into typed payment events, and routes
//! each event to the matching handler.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions ([`webhook::PaymentEventHandler`],
//!   [`webhook::IdempotencyStore`])
//! - Secrets are injected once at start-up and never re-read from the environment
//! - Every failure is classified so the HTTP layer can map it to a status code
//!
//! ## Usage
//!
//! ```rust
//! use storefront_core::webhook::{generate_signature, verify_signature};
//!
//! let payload = serde_json::json!({"event_type": "checkout.session.completed", "data": {}});
//! let signature = generate_signature(&payload, "whsec_example");
//! assert!(verify_signature(&payload, &signature, "whsec_example"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Provider-assigned identifier of a webhook event.
///
/// Used as the de-duplication key when the same event is delivered more than
/// once. The provider controls the format, so only basic hygiene is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Maximum accepted identifier length.
    pub const MAX_LENGTH: usize = 255;

    /// Create new event ID with validation
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "event_id".to_string(),
            });
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: "event_id".to_string(),
                max_length: Self::MAX_LENGTH,
            });
        }

        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidCharacters {
                field: "event_id".to_string(),
                invalid_chars: "non-ASCII or whitespace".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get duration since another timestamp
    ///
    /// Returns zero when `other` is later than `self`.
    pub fn duration_since(&self, other: Self) -> Duration {
        let chrono_duration = self.0.signed_duration_since(other.0);
        chrono_duration.to_std().unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Secret values that must never be logged
pub mod secret;

/// Webhook verification and payment event dispatch
pub mod webhook;

// Re-export key types for convenience
pub use secret::SecretValue;
pub use webhook::{
    DispatchOutcome, EventDispatcher, PaymentEvent, PaymentEventHandler, SignatureVerifier,
    WebhookError,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

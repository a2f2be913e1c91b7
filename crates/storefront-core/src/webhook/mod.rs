//! # Webhook Processing Module
//!
//! Authenticates payment-provider webhooks and routes them to handlers.
//!
//! # Core Components
//!
//! - [`SignatureVerifier`] - HMAC-SHA256 signature generation and constant-time verification
//! - [`PaymentEvent`] - Typed event decoded from the `event_type`/`data` envelope
//! - [`EventDispatcher`] - Request pipeline: parse, verify, decode, de-duplicate, dispatch
//! - [`PaymentEventHandler`] - Application-provided processing logic
//! - [`IdempotencyStore`] - Record of processed event IDs
//!
//! # Request Lifecycle
//!
//! ```text
//! received -> body_parsed -> signature_checked -> event_parsed -> dispatched -> responded
//!     |             |                |                  |
//!     |             v                v                  v
//!     |     rejected_bad_request  rejected_unauthorized  rejected_server_error
//!     v
//!  accepted (includes unrecognised event types and duplicates)
//! ```
//!
//! # Security
//!
//! Signatures are compared in constant time. When no secret is configured,
//! every delivery is rejected.

use crate::ValidationError;
use std::fmt;

mod canonical;
pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod idempotency;
pub mod signature;

pub use dispatcher::{DispatchOutcome, EventDispatcher, DEFAULT_HANDLER_TIMEOUT};
pub use events::{
    CheckoutSessionData, EventDecodeError, EventEnvelope, PaymentEvent, PaymentEventKind,
    CHECKOUT_SESSION_COMPLETED, CHECKOUT_SESSION_FAILED,
};
pub use handler::{HandlerError, LoggingPaymentHandler, PaymentEventHandler};
pub use idempotency::{IdempotencyError, IdempotencyStore, InMemoryIdempotencyStore, SaveResult};
pub use signature::{
    generate_signature, generate_signature_for_bytes, verify_signature,
    verify_signature_for_bytes, PresentedSignature, SignatureAlgorithm, SignatureError,
    SignatureVerifier, SigningMode, NO_SECRET_SENTINEL,
};

// ============================================================================
// Terminal States
// ============================================================================

/// Final state of a single webhook request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    /// Body was not a JSON object
    RejectedBadRequest,
    /// Signature was absent, malformed, or did not match
    RejectedUnauthorized,
    /// Event decoding, handler, or idempotency store failed
    RejectedServerError,
    /// Dispatch succeeded (including ignored and duplicate events)
    Accepted,
}

impl TerminalState {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RejectedBadRequest => "rejected_bad_request",
            Self::RejectedUnauthorized => "rejected_unauthorized",
            Self::RejectedServerError => "rejected_server_error",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Why a delivery failed authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No signature header on the request
    MissingSignature,
    /// Signature present but did not verify
    Mismatch,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSignature => f.write_str("missing signature"),
            Self::Mismatch => f.write_str("signature mismatch"),
        }
    }
}

/// Top-level error for webhook processing failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Malformed payload: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: AuthFailure },

    #[error("Webhook secret is not configured")]
    Unconfigured,

    #[error("Event decoding failed: {0}")]
    InvalidEvent(#[from] EventDecodeError),

    #[error("Invalid event id: {0}")]
    InvalidEventId(#[from] ValidationError),

    #[error("Handler for '{event_type}' failed: {message}")]
    HandlerFailure { event_type: String, message: String },

    #[error("Handler for '{event_type}' timed out after {timeout_ms}ms")]
    HandlerTimeout { event_type: String, timeout_ms: u64 },

    #[error("Idempotency store failed: {0}")]
    Idempotency(#[from] IdempotencyError),
}

impl WebhookError {
    /// HTTP status code reported to the provider
    pub fn status_code(&self) -> u16 {
        match self.terminal_state() {
            TerminalState::RejectedBadRequest => 400,
            TerminalState::RejectedUnauthorized => 401,
            TerminalState::RejectedServerError | TerminalState::Accepted => 500,
        }
    }

    /// Terminal state this error leaves the request in
    pub fn terminal_state(&self) -> TerminalState {
        match self {
            Self::BadRequest { .. } => TerminalState::RejectedBadRequest,
            Self::Unauthorized { .. } | Self::Unconfigured => TerminalState::RejectedUnauthorized,
            Self::InvalidEvent(_)
            | Self::InvalidEventId(_)
            | Self::HandlerFailure { .. }
            | Self::HandlerTimeout { .. }
            | Self::Idempotency(_) => TerminalState::RejectedServerError,
        }
    }

    /// Check if error is transient and the provider should redeliver
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HandlerFailure { .. } => true,
            Self::HandlerTimeout { .. } => true,
            Self::Idempotency(_) => true,
            Self::InvalidEvent(_) => false,
            Self::InvalidEventId(_) => false,
            Self::BadRequest { .. } => false,
            Self::Unauthorized { .. } => false,
            Self::Unconfigured => false,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

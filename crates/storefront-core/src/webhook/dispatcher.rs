//! Webhook request pipeline.
//!
//! [`EventDispatcher::process`] takes the raw body and signature header of a
//! delivery and runs it through every stage:
//!
//! 1. Parse the body as a JSON object
//! 2. Verify the signature against the configured secret
//! 3. Decode the `event_type`/`data` envelope into a [`PaymentEvent`]
//! 4. Skip events whose id was already processed
//! 5. Invoke the matching [`PaymentEventHandler`] method under a timeout
//! 6. Record the event id once the handler succeeds
//!
//! Each failure maps to exactly one [`WebhookError`] variant, which in turn
//! maps to one HTTP status.

use super::events::{EventEnvelope, PaymentEvent, PaymentEventKind};
use super::handler::{HandlerError, PaymentEventHandler};
use super::idempotency::{IdempotencyStore, SaveResult};
use super::signature::SignatureVerifier;
use super::{AuthFailure, WebhookError};
use crate::EventId;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default upper bound on a single handler invocation
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(10);

/// How an accepted delivery was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and succeeded
    Handled(PaymentEventKind),
    /// Event type has no handler; acknowledged without action
    Ignored { event_type: String },
    /// Event id was already processed; handler not invoked
    Duplicate { event_id: EventId },
}

/// Verifies, decodes, and routes webhook deliveries.
///
/// One dispatcher is built at start-up and shared by all requests.
pub struct EventDispatcher {
    verifier: SignatureVerifier,
    handler: Arc<dyn PaymentEventHandler>,
    idempotency: Option<Arc<dyn IdempotencyStore>>,
    handler_timeout: Duration,
}

impl EventDispatcher {
    /// Create a dispatcher without de-duplication.
    pub fn new(verifier: SignatureVerifier, handler: Arc<dyn PaymentEventHandler>) -> Self {
        Self {
            verifier,
            handler,
            idempotency: None,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Skip events whose id is already recorded in `store`.
    pub fn with_idempotency_store(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.idempotency = Some(store);
        self
    }

    /// Bound each handler invocation by `timeout`.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Signature verifier in use
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Process one delivery.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::BadRequest`] if the body is not a JSON object
    /// - [`WebhookError::Unconfigured`] if no secret is configured
    /// - [`WebhookError::Unauthorized`] if the signature is absent or wrong
    /// - [`WebhookError::InvalidEvent`] / [`WebhookError::InvalidEventId`] if
    ///   the envelope or a recognised event's data is malformed
    /// - [`WebhookError::HandlerFailure`] / [`WebhookError::HandlerTimeout`]
    ///   if the handler fails, panics, or runs too long
    /// - [`WebhookError::Idempotency`] if the idempotency store fails
    pub async fn process(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload = parse_body(body)?;

        self.authenticate(&payload, body, signature)?;

        let envelope = EventEnvelope::from_value(payload)?;
        let event_id = envelope.event_id()?;
        let event = envelope.into_event()?;

        if let (Some(store), Some(id)) = (&self.idempotency, &event_id) {
            if store.is_processed(id).await? {
                info!(
                    event_id = %id,
                    event_type = event.event_type(),
                    "Duplicate event, skipping handler"
                );
                return Ok(DispatchOutcome::Duplicate {
                    event_id: id.clone(),
                });
            }
        }

        let outcome = self.dispatch(event).await?;

        if let (Some(store), Some(id)) = (&self.idempotency, &event_id) {
            if store.mark_processed(id).await? == SaveResult::AlreadyExists {
                debug!(event_id = %id, "Event recorded by a concurrent delivery");
            }
        }

        Ok(outcome)
    }

    /// Invoke the handler for a decoded event.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::HandlerFailure`] when the handler returns an
    /// error or panics, and [`WebhookError::HandlerTimeout`] when it does not
    /// finish within the configured timeout.
    pub async fn dispatch(&self, event: PaymentEvent) -> Result<DispatchOutcome, WebhookError> {
        let (kind, data) = match event {
            PaymentEvent::CheckoutCompleted(data) => (PaymentEventKind::CheckoutCompleted, data),
            PaymentEvent::CheckoutFailed(data) => (PaymentEventKind::CheckoutFailed, data),
            PaymentEvent::Unrecognized { event_type, .. } => {
                info!(event_type = %event_type, "Unhandled event type");
                return Ok(DispatchOutcome::Ignored { event_type });
            }
        };

        let invocation = match kind {
            PaymentEventKind::CheckoutCompleted => self.handler.on_payment_completed(&data),
            PaymentEventKind::CheckoutFailed => self.handler.on_payment_failed(&data),
        };

        let result =
            tokio::time::timeout(self.handler_timeout, AssertUnwindSafe(invocation).catch_unwind())
                .await;

        match result {
            Ok(Ok(Ok(()))) => {
                debug!(event_type = %kind, "Handler completed");
                Ok(DispatchOutcome::Handled(kind))
            }
            Ok(Ok(Err(handler_error))) => {
                warn!(event_type = %kind, error = %handler_error, "Handler returned an error");
                Err(handler_failure(kind, &handler_error))
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!(event_type = %kind, panic = %message, "Handler panicked");
                Err(WebhookError::HandlerFailure {
                    event_type: kind.to_string(),
                    message: format!("handler panicked: {}", message),
                })
            }
            Err(_) => {
                let timeout_ms = u64::try_from(self.handler_timeout.as_millis()).unwrap_or(u64::MAX);
                error!(event_type = %kind, timeout_ms, "Handler timed out");
                Err(WebhookError::HandlerTimeout {
                    event_type: kind.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    fn authenticate(
        &self,
        payload: &Value,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookError> {
        if !self.verifier.is_configured() {
            error!("Webhook secret is not configured; rejecting delivery");
            return Err(WebhookError::Unconfigured);
        }

        let Some(signature) = signature else {
            warn!("Webhook delivery has no signature header");
            return Err(WebhookError::Unauthorized {
                reason: AuthFailure::MissingSignature,
            });
        };

        if !self.verifier.verify(payload, body, signature) {
            warn!("Webhook signature verification failed");
            return Err(WebhookError::Unauthorized {
                reason: AuthFailure::Mismatch,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("verifier", &self.verifier)
            .field("idempotency", &self.idempotency.is_some())
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}

/// Parse the body, requiring a JSON object at the top level.
fn parse_body(body: &[u8]) -> Result<Value, WebhookError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| WebhookError::BadRequest {
        message: format!("invalid JSON: {}", e),
    })?;

    if !payload.is_object() {
        return Err(WebhookError::BadRequest {
            message: "payload must be a JSON object".to_string(),
        });
    }

    Ok(payload)
}

fn handler_failure(kind: PaymentEventKind, error: &HandlerError) -> WebhookError {
    WebhookError::HandlerFailure {
        event_type: kind.to_string(),
        message: error.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

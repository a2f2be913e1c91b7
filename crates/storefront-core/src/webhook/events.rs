//! Typed payment events decoded from the webhook envelope.
//!
//! Every delivery carries `event_type` and `data`, plus an optional event
//! `id`. Recognised event types decode `data` into a validated shape at the
//! dispatch boundary; anything else is kept as [`PaymentEvent::Unrecognized`]
//! and acknowledged without action.

use crate::{EventId, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Event type sent when the buyer completes payment
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Event type sent when payment fails
pub const CHECKOUT_SESSION_FAILED: &str = "checkout.session.failed";

// ============================================================================
// Envelope
// ============================================================================

/// Outer shape of every webhook delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Provider-supplied event identifier, when present
    #[serde(
        default,
        alias = "event_id",
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Routing key
    pub event_type: String,

    /// Event-specific body
    #[serde(default)]
    pub data: Value,
}

/// Accept string or integer identifiers.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "event id must be a string or number, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl EventEnvelope {
    /// Decode the envelope from an already-parsed body.
    ///
    /// # Errors
    ///
    /// - [`EventDecodeError::NotAnObject`] if the body is not a JSON object
    /// - [`EventDecodeError::MissingEventType`] if `event_type` is absent
    /// - [`EventDecodeError::InvalidEnvelope`] for any other shape mismatch
    pub fn from_value(value: Value) -> Result<Self, EventDecodeError> {
        let Value::Object(ref object) = value else {
            return Err(EventDecodeError::NotAnObject {
                found: json_type_name(&value),
            });
        };

        if !object.contains_key("event_type") {
            return Err(EventDecodeError::MissingEventType);
        }

        serde_json::from_value(value).map_err(EventDecodeError::InvalidEnvelope)
    }

    /// Validated event identifier, if the provider sent one
    pub fn event_id(&self) -> Result<Option<EventId>, ValidationError> {
        self.id.clone().map(EventId::new).transpose()
    }

    /// Decode `data` according to `event_type`.
    pub fn into_event(self) -> Result<PaymentEvent, EventDecodeError> {
        PaymentEvent::decode(self.event_type, self.data)
    }
}

// ============================================================================
// Event Data
// ============================================================================

/// Checkout session details carried by checkout events.
///
/// Known fields are typed; everything else the provider sends is preserved
/// in `extra`. `data` must be a JSON object and typed fields must have the
/// declared JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// PaymentEvent
// ============================================================================

/// Kinds of event that have a dedicated handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentEventKind {
    CheckoutCompleted,
    CheckoutFailed,
}

impl PaymentEventKind {
    /// Wire name of this event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted => CHECKOUT_SESSION_COMPLETED,
            Self::CheckoutFailed => CHECKOUT_SESSION_FAILED,
        }
    }
}

impl fmt::Display for PaymentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded webhook event
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    /// `checkout.session.completed`
    CheckoutCompleted(CheckoutSessionData),
    /// `checkout.session.failed`
    CheckoutFailed(CheckoutSessionData),
    /// Any other event type; acknowledged and ignored
    Unrecognized { event_type: String, data: Value },
}

impl PaymentEvent {
    /// Decode `data` for the given `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventDecodeError::InvalidData`] when a recognised event's
    /// `data` does not match its schema. Unrecognised types never fail.
    pub fn decode(event_type: String, data: Value) -> Result<Self, EventDecodeError> {
        let kind = match event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => PaymentEventKind::CheckoutCompleted,
            CHECKOUT_SESSION_FAILED => PaymentEventKind::CheckoutFailed,
            _ => return Ok(Self::Unrecognized { event_type, data }),
        };

        let session: CheckoutSessionData =
            serde_json::from_value(data).map_err(|source| EventDecodeError::InvalidData {
                event_type: event_type.clone(),
                source,
            })?;

        Ok(match kind {
            PaymentEventKind::CheckoutCompleted => Self::CheckoutCompleted(session),
            PaymentEventKind::CheckoutFailed => Self::CheckoutFailed(session),
        })
    }

    /// Wire event type
    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            Self::CheckoutFailed(_) => CHECKOUT_SESSION_FAILED,
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }

    /// Handler kind, or `None` for unrecognised events
    pub fn kind(&self) -> Option<PaymentEventKind> {
        match self {
            Self::CheckoutCompleted(_) => Some(PaymentEventKind::CheckoutCompleted),
            Self::CheckoutFailed(_) => Some(PaymentEventKind::CheckoutFailed),
            Self::Unrecognized { .. } => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors decoding a parsed body into a [`PaymentEvent`]
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("Event payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Event payload has no event_type field")]
    MissingEventType,

    #[error("Event envelope is invalid: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("Data for '{event_type}' is invalid: {source}")]
    InvalidData {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

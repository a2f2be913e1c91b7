//! Tests for envelope and payment event decoding.

use super::*;
use serde_json::json;

#[test]
fn test_completed_event_decodes_session_data() {
    let envelope = EventEnvelope::from_value(json!({
        "event_type": "checkout.session.completed",
        "data": {
            "session_id": "cs_42",
            "order_id": "ord_1",
            "merchant_id": "327813",
            "amount_usd": 30,
            "user": {"user_id": "user_abc123"},
            "points_spent": 30
        }
    }))
    .unwrap();

    let event = envelope.into_event().unwrap();

    let PaymentEvent::CheckoutCompleted(data) = event else {
        panic!("expected CheckoutCompleted, got {:?}", event);
    };
    assert_eq!(data.session_id.as_deref(), Some("cs_42"));
    assert_eq!(data.order_id.as_deref(), Some("ord_1"));
    assert_eq!(data.merchant_id.as_deref(), Some("327813"));
    assert_eq!(data.amount_usd, Some(30.0));
    assert_eq!(
        data.user.as_ref().and_then(|u| u.get("user_id")),
        Some(&json!("user_abc123"))
    );
    assert_eq!(data.extra.get("points_spent"), Some(&json!(30)));
}

#[test]
fn test_failed_event_accepts_empty_data_object() {
    let event = PaymentEvent::decode(CHECKOUT_SESSION_FAILED.to_string(), json!({})).unwrap();

    assert_eq!(event, PaymentEvent::CheckoutFailed(CheckoutSessionData::default()));
    assert_eq!(event.kind(), Some(PaymentEventKind::CheckoutFailed));
    assert_eq!(event.event_type(), "checkout.session.failed");
}

#[test]
fn test_unknown_event_type_is_not_an_error() {
    let event = PaymentEvent::decode("unknown.thing".to_string(), json!([1, 2, 3])).unwrap();

    assert_eq!(event.kind(), None);
    assert_eq!(event.event_type(), "unknown.thing");
    assert!(matches!(event, PaymentEvent::Unrecognized { ref data, .. } if data == &json!([1, 2, 3])));
}

#[test]
fn test_recognised_event_with_non_object_data_fails_schema_check() {
    for data in [json!(null), json!("paid"), json!(12), json!([])] {
        let result = PaymentEvent::decode(CHECKOUT_SESSION_COMPLETED.to_string(), data.clone());
        assert!(
            matches!(result, Err(EventDecodeError::InvalidData { .. })),
            "data {} should be rejected",
            data
        );
    }
}

#[test]
fn test_recognised_event_with_mistyped_field_fails_schema_check() {
    let result = PaymentEvent::decode(
        CHECKOUT_SESSION_COMPLETED.to_string(),
        json!({"order_id": 17}),
    );

    let err = result.unwrap_err();
    assert!(err.to_string().contains("checkout.session.completed"));
}

#[test]
fn test_envelope_requires_object() {
    let result = EventEnvelope::from_value(json!(["event_type"]));
    assert!(matches!(
        result,
        Err(EventDecodeError::NotAnObject { found: "array" })
    ));
}

#[test]
fn test_envelope_requires_event_type() {
    let result = EventEnvelope::from_value(json!({"data": {}}));
    assert!(matches!(result, Err(EventDecodeError::MissingEventType)));
}

#[test]
fn test_envelope_rejects_non_string_event_type() {
    let result = EventEnvelope::from_value(json!({"event_type": 5, "data": {}}));
    assert!(matches!(result, Err(EventDecodeError::InvalidEnvelope(_))));
}

#[test]
fn test_envelope_data_defaults_to_null() {
    let envelope = EventEnvelope::from_value(json!({"event_type": "ping"})).unwrap();
    assert_eq!(envelope.data, Value::Null);
    assert_eq!(envelope.id, None);
}

#[test]
fn test_envelope_reads_string_and_numeric_ids() {
    let with_string =
        EventEnvelope::from_value(json!({"id": "evt_1", "event_type": "x"})).unwrap();
    assert_eq!(with_string.id.as_deref(), Some("evt_1"));

    let with_number =
        EventEnvelope::from_value(json!({"event_id": 991, "event_type": "x"})).unwrap();
    assert_eq!(with_number.id.as_deref(), Some("991"));
    assert_eq!(
        with_number.event_id().unwrap().map(|id| id.to_string()),
        Some("991".to_string())
    );
}

#[test]
fn test_envelope_rejects_structured_id() {
    let result = EventEnvelope::from_value(json!({"id": {"nested": true}, "event_type": "x"}));
    assert!(matches!(result, Err(EventDecodeError::InvalidEnvelope(_))));
}

#[test]
fn test_invalid_event_id_is_reported() {
    let envelope = EventEnvelope::from_value(json!({"id": "", "event_type": "x"})).unwrap();
    assert!(envelope.event_id().is_err());
}

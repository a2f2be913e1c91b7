//! Handler trait for application-provided payment event processing.
//!
//! Handlers receive validated [`CheckoutSessionData`] for the event types
//! they cover. Fulfilment, ledger updates, and notifications belong in an
//! implementation of [`PaymentEventHandler`]; the bundled
//! [`LoggingPaymentHandler`] only records that the event arrived.
//!
//! # Error Handling
//!
//! A handler error is caught by the dispatcher and reported to the provider
//! as a server error so the delivery is retried. Handlers must therefore be
//! idempotent: the same event can arrive more than once.
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_core::webhook::{CheckoutSessionData, HandlerError, PaymentEventHandler};
//! use async_trait::async_trait;
//!
//! struct FulfilOrders;
//!
//! #[async_trait]
//! impl PaymentEventHandler for FulfilOrders {
//!     async fn on_payment_completed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
//!         println!("fulfilling order {:?}", data.order_id);
//!         Ok(())
//!     }
//!
//!     async fn on_payment_failed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
//!         println!("payment failed for order {:?}", data.order_id);
//!         Ok(())
//!     }
//! }
//! ```

use super::events::{CheckoutSessionData, CHECKOUT_SESSION_COMPLETED, CHECKOUT_SESSION_FAILED};
use async_trait::async_trait;
use std::error::Error;
use tracing::info;

/// Error returned by handler implementations
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Application-provided payment event handler.
///
/// Handlers must be `Send + Sync`; one instance serves all requests.
#[async_trait]
pub trait PaymentEventHandler: Send + Sync {
    /// Handle `checkout.session.completed`
    async fn on_payment_completed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError>;

    /// Handle `checkout.session.failed`
    async fn on_payment_failed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError>;
}

/// Handler that logs each event and takes no further action.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPaymentHandler;

#[async_trait]
impl PaymentEventHandler for LoggingPaymentHandler {
    async fn on_payment_completed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
        info!(
            event_type = CHECKOUT_SESSION_COMPLETED,
            session_id = data.session_id.as_deref().unwrap_or("-"),
            order_id = data.order_id.as_deref().unwrap_or("-"),
            amount_usd = data.amount_usd,
            "Payment completed"
        );
        Ok(())
    }

    async fn on_payment_failed(&self, data: &CheckoutSessionData) -> Result<(), HandlerError> {
        info!(
            event_type = CHECKOUT_SESSION_FAILED,
            session_id = data.session_id.as_deref().unwrap_or("-"),
            order_id = data.order_id.as_deref().unwrap_or("-"),
            status = data.status.as_deref().unwrap_or("-"),
            "Payment failed"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;

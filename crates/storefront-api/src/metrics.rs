//! Metrics collection for the API service.
//!
//! Metrics are registered in a registry owned by [`ServiceMetrics`] rather
//! than the process-global default, so several routers can coexist in one
//! process.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use storefront_core::webhook::TerminalState;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounter,
    pub http_request_duration: Histogram,

    // Webhook processing metrics
    pub webhook_requests_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub signature_validation_failures: IntCounter,
    pub duplicate_events_total: IntCounter,

    // Checkout proxy metrics
    pub checkout_proxy_requests_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("storefront".to_string()), None)?;

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;
        let webhook_requests_total = IntCounterVec::new(
            Opts::new(
                "webhook_requests_total",
                "Webhook requests by terminal state",
            ),
            &["outcome"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let signature_validation_failures = IntCounter::new(
            "signature_validation_failures",
            "Webhook deliveries rejected as unauthenticated",
        )?;
        let duplicate_events_total = IntCounter::new(
            "duplicate_events_total",
            "Webhook deliveries skipped as already processed",
        )?;
        let checkout_proxy_requests_total = IntCounterVec::new(
            Opts::new(
                "checkout_proxy_requests_total",
                "Checkout proxy calls by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(signature_validation_failures.clone()))?;
        registry.register(Box::new(duplicate_events_total.clone()))?;
        registry.register(Box::new(checkout_proxy_requests_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            webhook_requests_total,
            webhook_duration_seconds,
            signature_validation_failures,
            duplicate_events_total,
            checkout_proxy_requests_total,
        }))
    }

    /// Record the outcome of one webhook request
    pub fn record_webhook(&self, state: TerminalState, duration: std::time::Duration) {
        self.webhook_requests_total
            .with_label_values(&[state.as_str()])
            .inc();
        self.webhook_duration_seconds
            .observe(duration.as_secs_f64());
        if state == TerminalState::RejectedUnauthorized {
            self.signature_validation_failures.inc();
        }
    }

    /// Record one checkout proxy call; `result` is `relayed` or `error`
    pub fn record_checkout(&self, result: &str) {
        self.checkout_proxy_requests_total
            .with_label_values(&[result])
            .inc();
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

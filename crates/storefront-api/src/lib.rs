//! # Storefront API
//!
//! HTTP surface of the storefront backend:
//!
//! - `POST {webhooks.endpoint_path}` receives signed payment webhooks and
//!   hands them to the [`EventDispatcher`]
//! - `POST /api/checkout/sessions` proxies checkout-session creation to the
//!   payment provider
//! - `GET /health`, `GET /ready`, `GET /metrics` for operations

pub mod checkout_proxy;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use checkout_proxy::{CheckoutProxy, UpstreamResponse};
pub use config::{CheckoutConfig, LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{CheckoutProxyError, ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use responses::{HealthCheckResult, HealthResponse, HealthStatus, ReadinessResponse};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};
use storefront_core::{
    webhook::{
        DispatchOutcome, EventDispatcher, IdempotencyStore, InMemoryIdempotencyStore,
        PaymentEventHandler, SignatureVerifier, TerminalState,
    },
    Timestamp,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

/// Path of the checkout-session proxy route
pub const CHECKOUT_SESSIONS_PATH: &str = "/api/checkout/sessions";

/// Header used to correlate log lines for one request
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Webhook pipeline
    pub dispatcher: Arc<EventDispatcher>,

    /// Checkout proxy, absent when not configured
    pub checkout_proxy: Option<Arc<CheckoutProxy>>,

    /// Health checker for system monitoring
    pub health_checker: Arc<dyn HealthChecker>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        dispatcher: Arc<EventDispatcher>,
        checkout_proxy: Option<Arc<CheckoutProxy>>,
        health_checker: Arc<dyn HealthChecker>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            checkout_proxy,
            health_checker,
            metrics,
        }
    }

    /// Wire every component from configuration.
    ///
    /// The webhook secret and checkout API key are read from `config` once
    /// here and never again.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] if metrics or the checkout
    /// HTTP client cannot be initialised.
    pub fn from_config(
        config: ServiceConfig,
        handler: Arc<dyn PaymentEventHandler>,
    ) -> Result<Self, ServiceError> {
        let verifier = SignatureVerifier::new(config.webhooks.secret.clone())
            .with_mode(config.webhooks.signing_mode);

        let store: Arc<dyn IdempotencyStore> = match config.webhooks.dedup_retention() {
            Some(retention) => Arc::new(InMemoryIdempotencyStore::with_retention(retention)),
            None => Arc::new(InMemoryIdempotencyStore::new()),
        };

        let dispatcher = EventDispatcher::new(verifier, handler)
            .with_idempotency_store(store)
            .with_handler_timeout(config.webhooks.handler_timeout());

        let checkout_proxy = match &config.checkout {
            Some(checkout) => Some(Arc::new(
                CheckoutProxy::new(checkout, config.server.upstream_timeout()).map_err(|e| {
                    ServiceError::Configuration(ConfigError::Invalid {
                        message: e.to_string(),
                    })
                })?,
            )),
            None => {
                warn!("No checkout configuration; {} will fail closed", CHECKOUT_SESSIONS_PATH);
                None
            }
        };

        let metrics = ServiceMetrics::new().map_err(|e| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: format!("Failed to initialize metrics: {}", e),
            })
        })?;

        let health_checker = Arc::new(DefaultHealthChecker::new(
            dispatcher.verifier().is_configured(),
        ));

        Ok(Self::new(
            config,
            Arc::new(dispatcher),
            checkout_proxy,
            health_checker,
            metrics,
        ))
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let server_config = &state.config.server;

    let webhook_routes = Router::new()
        .route(&state.config.webhooks.endpoint_path, post(handle_webhook))
        .route(CHECKOUT_SESSIONS_PATH, post(handle_checkout_session));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    let mut router = Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(DefaultBodyLimit::max(server_config.max_body_size));

    if server_config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }
    if server_config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    request_logging_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM, then lets in-flight requests finish for up
/// to `server.shutdown_timeout_seconds`.
pub async fn start_server(
    config: ServiceConfig,
    handler: Arc<dyn PaymentEventHandler>,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::from_config(config, handler)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_started = Arc::new(tokio::sync::Notify::new());
    let signal_notify = shutdown_started.clone();
    let shutdown_signal = async move {
        wait_for_shutdown_signal().await;
        info!(
            "Initiating graceful shutdown with {}s timeout",
            shutdown_timeout.as_secs()
        );
        signal_notify.notify_one();
    };

    // The server stops accepting connections on the signal, then waits for
    // in-flight requests; the deadline bounds that wait.
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .into_future();
    let deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = deadline => {
            warn!("Graceful shutdown timed out; dropping in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle payment provider webhooks
///
/// Responds `200 OK` once the event has been handled, ignored as an unknown
/// type, or skipped as a duplicate. Rejections use the plain-text bodies the
/// provider expects; see [`WebhookHandlerError`].
#[instrument(skip(state, headers, body), fields(body_size = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookHandlerError> {
    let start = std::time::Instant::now();

    let signature = headers
        .get(state.config.webhooks.signature_header.as_str())
        .map(|value| value.to_str().unwrap_or_default());

    let result = state.dispatcher.process(&body, signature).await;

    let terminal_state = match &result {
        Ok(_) => TerminalState::Accepted,
        Err(e) => e.terminal_state(),
    };
    state.metrics.record_webhook(terminal_state, start.elapsed());

    match result? {
        DispatchOutcome::Handled(kind) => {
            info!(event_type = %kind, "Webhook processed");
        }
        DispatchOutcome::Ignored { event_type } => {
            info!(event_type = %event_type, "Webhook acknowledged without handler");
        }
        DispatchOutcome::Duplicate { event_id } => {
            state.metrics.duplicate_events_total.inc();
            info!(event_id = %event_id, "Duplicate webhook acknowledged");
        }
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        errors::webhook_body::OK,
    )
        .into_response())
}

// ============================================================================
// Checkout Proxy Handler
// ============================================================================

/// Create a checkout session through the upstream API
#[instrument(skip(state, body), fields(body_size = body.len()))]
pub async fn handle_checkout_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), CheckoutProxyError> {
    let Some(proxy) = state.checkout_proxy.as_ref() else {
        state.metrics.record_checkout("error");
        return Err(CheckoutProxyError::NotConfigured);
    };

    match proxy.forward_bytes(&body).await {
        Ok(upstream) => {
            state.metrics.record_checkout("relayed");
            Ok((upstream.status, Json(upstream.body)))
        }
        Err(e) => {
            state.metrics.record_checkout("error");
            Err(e)
        }
    }
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let status = state.health_checker.check_basic_health().await;

    if status.is_healthy {
        Ok(Json(status.into_response()))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Readiness check for load balancers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let ready = state.health_checker.check_readiness().await;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            timestamp: Timestamp::now(),
        }),
    )
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .render()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Request logging middleware with correlation ID tracking
///
/// Extracts or generates a correlation ID, logs request completion with
/// structured fields, counts the request, and echoes the ID back in the
/// response headers.
#[instrument(skip(state, request, next), fields(
    method = %request.method(),
    uri = %request.uri().path(),
    correlation_id
))]
async fn request_logging_middleware(
    State(state): State<AppState>,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration
        .observe(duration.as_secs_f64());

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Health Checking
// ============================================================================

/// Interface for system health monitoring
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Basic health check (fast)
    async fn check_basic_health(&self) -> HealthStatus;

    /// Readiness check for load balancers
    async fn check_readiness(&self) -> bool;
}

/// Default health checker implementation
///
/// Alive whenever the process can respond; ready only when a webhook secret
/// is configured, since every delivery would be rejected otherwise.
pub struct DefaultHealthChecker {
    webhook_secret_configured: bool,
}

impl DefaultHealthChecker {
    pub fn new(webhook_secret_configured: bool) -> Self {
        Self {
            webhook_secret_configured,
        }
    }
}

#[async_trait::async_trait]
impl HealthChecker for DefaultHealthChecker {
    async fn check_basic_health(&self) -> HealthStatus {
        let mut checks = HashMap::new();

        checks.insert(
            "service".to_string(),
            HealthCheckResult {
                healthy: true,
                message: "Service is running".to_string(),
            },
        );
        checks.insert(
            "webhook_secret".to_string(),
            HealthCheckResult {
                healthy: self.webhook_secret_configured,
                message: if self.webhook_secret_configured {
                    "Webhook secret configured".to_string()
                } else {
                    "Webhook secret missing; deliveries will be rejected".to_string()
                },
            },
        );

        HealthStatus {
            is_healthy: true,
            checks,
        }
    }

    async fn check_readiness(&self) -> bool {
        self.webhook_secret_configured
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

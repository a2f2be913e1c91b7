//! Storefront Service - HTTP server for payment webhooks
//!
//! Main entry point for the service binary.

use anyhow::Context;
use std::sync::Arc;
use storefront_api::{start_server, LoggingConfig, ServiceError};
use storefront_core::webhook::LoggingPaymentHandler;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config_loader;

/// Exit code when the listener cannot bind
const EXIT_BIND_FAILED: i32 = 1;
/// Exit code when the server stops with an error
const EXIT_SERVER_FAILED: i32 = 2;
/// Exit code for missing or invalid configuration
const EXIT_CONFIG_INVALID: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match config_loader::load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default())?;
            error!(error = %e, "Failed to load configuration");
            std::process::exit(EXIT_CONFIG_INVALID);
        }
    };

    init_tracing(&config.logging)?;

    info!("Starting Storefront Service");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        std::process::exit(EXIT_CONFIG_INVALID);
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        webhook_path = %config.webhooks.endpoint_path,
        signing_mode = ?config.webhooks.signing_mode,
        checkout_proxy = config.checkout.is_some(),
        "Configuration loaded"
    );

    if let Err(e) = start_server(config, Arc::new(LoggingPaymentHandler)).await {
        error!(error = %e, "Server failed");
        let exit_code = match e {
            ServiceError::BindFailed { .. } => EXIT_BIND_FAILED,
            ServiceError::ServerFailed { .. } => EXIT_SERVER_FAILED,
            ServiceError::Configuration(_) => EXIT_CONFIG_INVALID,
        };
        std::process::exit(exit_code);
    }

    info!("Storefront Service stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "storefront_service={level},storefront_api={level},storefront_core={level},tower_http=debug"
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json_format {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.context("Failed to install tracing subscriber")
}

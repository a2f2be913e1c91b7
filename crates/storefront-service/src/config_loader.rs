//! Layered configuration loading for the service binary.
//!
//! Sources, lowest precedence first:
//!
//! 1. `/etc/storefront/service.yaml`
//! 2. `config/service.yaml` relative to the working directory
//! 3. The file named by `STOREFRONT_CONFIG_FILE` (must exist when set)
//! 4. `STOREFRONT__*` environment variables, `__` separating nested keys
//! 5. Deployment variables kept for existing environments:
//!    `GAME_POINTS_WEBHOOK_SECRET`, `SMASHPOINTS_API_KEY`, `TARGET_API_URL`

use storefront_api::{ConfigError, ServiceConfig};

/// Environment variable naming an extra configuration file
pub const CONFIG_FILE_ENV: &str = "STOREFRONT_CONFIG_FILE";

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "STOREFRONT";

/// Deployment variables mapped onto configuration keys.
pub const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("GAME_POINTS_WEBHOOK_SECRET", "webhooks.secret"),
    ("SMASHPOINTS_API_KEY", "checkout.api_key"),
    ("TARGET_API_URL", "checkout.upstream_url"),
];

/// Load the service configuration from all sources.
///
/// Validation is left to the caller.
///
/// # Errors
///
/// Returns [`ConfigError::Loading`] when a required file is missing or a
/// value cannot be deserialized into [`ServiceConfig`].
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/storefront/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = non_empty_env(CONFIG_FILE_ENV) {
        builder = builder.add_source(config::File::with_name(&path).required(true));
    }

    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

    for (variable, key) in LEGACY_OVERRIDES {
        builder = builder.set_override_option(*key, non_empty_env(variable))?;
    }

    let config = builder.build()?.try_deserialize::<ServiceConfig>()?;
    Ok(config)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "config_loader_tests.rs"]
mod tests;

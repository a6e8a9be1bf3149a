//! Configuration
//!
//! Layered YAML configuration with `${VAR}` / `${VAR:-default}`
//! environment-variable interpolation, matching the loader shape the
//! corpus uses elsewhere in this workspace.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_core::infrastructure::config::{Config, load_config};
//!
//! let config = load_config(Some("config.yaml"))?;
//! println!("http port: {}", config.server.http_port);
//! ```

mod environment;
mod idempotency;
mod messaging;
mod observability;
mod persistence;
mod server;
mod worker_pool;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use environment::EnvironmentConfig;
pub use idempotency::IdempotencyConfig;
pub use messaging::MessagingConfig;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use persistence::{PersistenceBackend, PersistenceConfig};
pub use server::ServerConfig;
pub use worker_pool::WorkerPoolSettings;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse YAML configuration.
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),
    /// Configuration validation failed.
    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure for the order-core binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Health/metrics HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Message bus connection configuration.
    #[serde(default)]
    pub messaging: MessagingConfig,
    /// Persistence backend configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Worker pool scaling configuration.
    #[serde(default)]
    pub worker_pool: WorkerPoolSettings,
    /// Idempotency-key retention configuration.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Observability (logging) configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Trading-environment configuration.
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            messaging: MessagingConfig::default(),
            persistence: PersistenceConfig::default(),
            worker_pool: WorkerPoolSettings::default(),
            idempotency: IdempotencyConfig::default(),
            observability: ObservabilityConfig::default(),
            environment: EnvironmentConfig::default(),
        }
    }
}

/// Loads configuration from a YAML file, interpolating environment
/// variables and validating the result.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Loads configuration from a YAML string (used for tests and for
/// `load_config`).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolates `${VAR}` and `${VAR:-default}` references against the
/// process environment.
#[allow(clippy::expect_used)]
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();
    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.worker_pool.min_workers == 0 {
        return Err(ConfigError::ValidationError(
            "worker_pool.min_workers must be at least 1".to_string(),
        ));
    }

    if config.worker_pool.max_workers < config.worker_pool.min_workers {
        return Err(ConfigError::ValidationError(
            "worker_pool.max_workers must be >= worker_pool.min_workers".to_string(),
        ));
    }

    if config.idempotency.ttl_hours <= 0 {
        return Err(ConfigError::ValidationError(
            "idempotency.ttl_hours must be positive".to_string(),
        ));
    }

    let valid_modes = ["PAPER", "LIVE"];
    if !valid_modes.contains(&config.environment.mode.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "environment.mode must be one of: {valid_modes:?}"
        )));
    }

    Ok(())
}

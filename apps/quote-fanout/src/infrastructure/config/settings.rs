//! Application Configuration
//!
//! Loads every tunable the oscillator, connection pool, autoscaler, health
//! monitor, and reconnection manager need from the environment (prefix
//! `QUOTE_FANOUT_`, nested keys separated by `__`), via the `config` crate
//! layered over `.env` (see [`crate::infrastructure::config::load_dotenv`]
//! in `main.rs`). A raw, serde-deserializable struct first captures the
//! primitive values `config` can parse directly; [`AppConfig::from_env`]
//! then converts those into the richer domain/application config types
//! (`Duration`, `Decimal`, enums) the rest of the service consumes.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::autoscale::AutoscaleConfig;
use crate::domain::circuit_breaker::CircuitBreakerConfig;
use crate::domain::health::HealthThresholds;
use crate::domain::reconnection::{ReconnectStrategy, ReconnectionConfig};
use crate::infrastructure::catalog::OscillatorConfig;
use crate::infrastructure::pool::PoolConfig;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The `config` crate failed to load or deserialize the environment.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// A loaded value was syntactically valid but semantically out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why it's invalid.
        reason: String,
    },
}

/// Which [`crate::application::ports::VerifyTokenPort`] implementation to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Accept any non-empty bearer token; for local development.
    #[default]
    Simulated,
    /// Delegate to an external auth service over HTTP.
    Http,
}

/// Server bind ports.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    /// Port the `/quotes` WebSocket endpoint listens on.
    pub websocket_port: u16,
    /// Port the `/healthz`/`/readyz` HTTP endpoints listen on.
    pub health_port: u16,
    /// Port the Prometheus `/metrics` endpoint listens on.
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            websocket_port: 8090,
            health_port: 8082,
            metrics_port: 9090,
        }
    }
}

/// Auth adapter settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Which implementation to construct.
    pub mode: AuthMode,
    /// Verification endpoint URL, required when `mode` is `Http`.
    pub verify_url: Option<String>,
    /// Timeout for a single verification call.
    pub timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            verify_url: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Every tunable the service loads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind ports.
    pub server: ServerSettings,
    /// Oscillator tick interval, subset size, and perturbation magnitude.
    pub oscillator: OscillatorConfig,
    /// Connection pool capacity and maintenance tunables.
    pub pool: PoolConfig,
    /// Autoscaler thresholds and gates.
    pub autoscale: AutoscaleConfig,
    /// Health monitor sampling interval and bands.
    pub health: HealthMonitorSettings,
    /// Reconnection manager backoff policy.
    pub reconnection: ReconnectionConfig,
    /// Auth adapter selection.
    pub auth: AuthSettings,
}

/// Health monitor settings (interval plus the thresholds [`classify`] uses).
///
/// [`classify`]: crate::domain::health::classify
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorSettings {
    /// How often to sample the pool.
    pub interval: Duration,
    /// Error-rate/load-ratio bands.
    pub thresholds: HealthThresholds,
}

impl Default for HealthMonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Raw, directly-deserializable shape the `config` crate populates from
/// environment variables. Mirrors [`AppConfig`] but with primitive types
/// only (`config`/`serde` can't deserialize `Duration` or `Decimal` from a
/// bare string without a custom visitor, so that conversion happens in
/// [`AppConfig::from_env`] instead).
#[derive(Debug, Deserialize, serde::Serialize)]
#[serde(default)]
struct RawSettings {
    websocket_port: u16,
    health_port: u16,
    metrics_port: u16,

    oscillator_tick_interval_secs: u64,
    oscillator_subset_size: usize,
    oscillator_perturbation_pct: String,

    pool_initial_capacity: u32,
    pool_connections_per_worker: u32,
    pool_maintenance_interval_secs: u64,
    pool_idle_timeout_secs: i64,
    pool_max_connection_age_secs: i64,
    pool_max_failures: u32,
    pool_breaker_failure_threshold: u32,
    pool_breaker_recovery_timeout_secs: u64,
    pool_breaker_half_open_trial_calls: u32,

    autoscale_scale_up_threshold: f64,
    autoscale_scale_down_threshold: f64,
    autoscale_cpu_gate: f64,
    autoscale_memory_gate: f64,
    autoscale_cooldown_secs: u64,
    autoscale_min_workers: u32,
    autoscale_max_workers: u32,

    health_interval_secs: u64,
    health_degraded_error_rate: f64,
    health_unhealthy_error_rate: f64,
    health_degraded_load_ratio: f64,
    health_unhealthy_load_ratio: f64,

    reconnect_strategy: String,
    reconnect_base_delay_ms: u64,
    reconnect_max_delay_secs: u64,
    reconnect_jitter_factor: f64,
    reconnect_max_attempts: u32,
    reconnect_timeout_per_attempt_secs: u64,

    auth_mode: AuthMode,
    auth_verify_url: Option<String>,
    auth_timeout_secs: u64,
}

impl Default for RawSettings {
    fn default() -> Self {
        let server = ServerSettings::default();
        let oscillator = OscillatorConfig::default();
        let pool = PoolConfig::default();
        let autoscale = AutoscaleConfig::default();
        let health = HealthMonitorSettings::default();
        let reconnect = ReconnectionConfig::default();
        let auth = AuthSettings::default();

        Self {
            websocket_port: server.websocket_port,
            health_port: server.health_port,
            metrics_port: server.metrics_port,

            oscillator_tick_interval_secs: oscillator.tick_interval.as_secs(),
            oscillator_subset_size: oscillator.subset_size,
            oscillator_perturbation_pct: oscillator.perturbation_pct.to_string(),

            pool_initial_capacity: pool.initial_capacity,
            pool_connections_per_worker: pool.connections_per_worker,
            pool_maintenance_interval_secs: pool.maintenance_interval.as_secs(),
            pool_idle_timeout_secs: pool.idle_timeout.num_seconds(),
            pool_max_connection_age_secs: pool.max_connection_age.num_seconds(),
            pool_max_failures: pool.max_failures,
            pool_breaker_failure_threshold: pool.breaker.failure_threshold,
            pool_breaker_recovery_timeout_secs: pool.breaker.recovery_timeout.as_secs(),
            pool_breaker_half_open_trial_calls: pool.breaker.half_open_trial_calls,

            autoscale_scale_up_threshold: autoscale.scale_up_threshold,
            autoscale_scale_down_threshold: autoscale.scale_down_threshold,
            autoscale_cpu_gate: autoscale.cpu_gate,
            autoscale_memory_gate: autoscale.memory_gate,
            autoscale_cooldown_secs: autoscale.cooldown.as_secs(),
            autoscale_min_workers: autoscale.min_workers,
            autoscale_max_workers: autoscale.max_workers,

            health_interval_secs: health.interval.as_secs(),
            health_degraded_error_rate: health.thresholds.degraded_error_rate,
            health_unhealthy_error_rate: health.thresholds.unhealthy_error_rate,
            health_degraded_load_ratio: health.thresholds.degraded_load_ratio,
            health_unhealthy_load_ratio: health.thresholds.unhealthy_load_ratio,

            reconnect_strategy: "exponential".to_string(),
            reconnect_base_delay_ms: reconnect.base_delay.as_millis() as u64,
            reconnect_max_delay_secs: reconnect.max_delay.as_secs(),
            reconnect_jitter_factor: reconnect.jitter_factor,
            reconnect_max_attempts: reconnect.max_attempts,
            reconnect_timeout_per_attempt_secs: reconnect.timeout_per_attempt.as_secs(),

            auth_mode: auth.mode,
            auth_verify_url: auth.verify_url,
            auth_timeout_secs: auth.timeout.as_secs(),
        }
    }
}

fn parse_strategy(raw: &str) -> ReconnectStrategy {
    match raw.to_lowercase().as_str() {
        "linear" => ReconnectStrategy::Linear,
        "fixed" => ReconnectStrategy::Fixed,
        _ => ReconnectStrategy::Exponential,
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to the
    /// defaults baked into [`RawSettings::default`] for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if an environment variable is present
    /// but fails to parse as its expected type, or [`ConfigError::Invalid`]
    /// if a loaded value is out of its valid range (e.g. a negative
    /// percentage).
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw: RawSettings = config::Config::builder()
            .add_source(config::Config::try_from(&RawSettings::default())?)
            .add_source(config::Environment::with_prefix("QUOTE_FANOUT").separator("__"))
            .build()?
            .try_deserialize()?;

        let perturbation_pct: Decimal = raw.oscillator_perturbation_pct.parse().map_err(|_| ConfigError::Invalid {
            field: "oscillator_perturbation_pct",
            reason: format!("{:?} is not a valid decimal", raw.oscillator_perturbation_pct),
        })?;

        if raw.auth_mode == AuthMode::Http && raw.auth_verify_url.is_none() {
            return Err(ConfigError::Invalid {
                field: "auth_verify_url",
                reason: "required when auth_mode is \"http\"".to_string(),
            });
        }

        Ok(Self {
            server: ServerSettings {
                websocket_port: raw.websocket_port,
                health_port: raw.health_port,
                metrics_port: raw.metrics_port,
            },
            oscillator: OscillatorConfig {
                tick_interval: Duration::from_secs(raw.oscillator_tick_interval_secs),
                subset_size: raw.oscillator_subset_size,
                perturbation_pct,
            },
            pool: PoolConfig {
                initial_capacity: raw.pool_initial_capacity,
                connections_per_worker: raw.pool_connections_per_worker,
                maintenance_interval: Duration::from_secs(raw.pool_maintenance_interval_secs),
                idle_timeout: chrono::Duration::seconds(raw.pool_idle_timeout_secs),
                max_connection_age: chrono::Duration::seconds(raw.pool_max_connection_age_secs),
                max_failures: raw.pool_max_failures,
                breaker: CircuitBreakerConfig {
                    failure_threshold: raw.pool_breaker_failure_threshold,
                    recovery_timeout: Duration::from_secs(raw.pool_breaker_recovery_timeout_secs),
                    half_open_trial_calls: raw.pool_breaker_half_open_trial_calls,
                },
            },
            autoscale: AutoscaleConfig {
                scale_up_threshold: raw.autoscale_scale_up_threshold,
                scale_down_threshold: raw.autoscale_scale_down_threshold,
                cpu_gate: raw.autoscale_cpu_gate,
                memory_gate: raw.autoscale_memory_gate,
                cooldown: Duration::from_secs(raw.autoscale_cooldown_secs),
                min_workers: raw.autoscale_min_workers,
                max_workers: raw.autoscale_max_workers,
            },
            health: HealthMonitorSettings {
                interval: Duration::from_secs(raw.health_interval_secs),
                thresholds: HealthThresholds {
                    degraded_error_rate: raw.health_degraded_error_rate,
                    unhealthy_error_rate: raw.health_unhealthy_error_rate,
                    degraded_load_ratio: raw.health_degraded_load_ratio,
                    unhealthy_load_ratio: raw.health_unhealthy_load_ratio,
                },
            },
            reconnection: ReconnectionConfig {
                strategy: parse_strategy(&raw.reconnect_strategy),
                base_delay: Duration::from_millis(raw.reconnect_base_delay_ms),
                max_delay: Duration::from_secs(raw.reconnect_max_delay_secs),
                jitter_factor: raw.reconnect_jitter_factor,
                max_attempts: raw.reconnect_max_attempts,
                timeout_per_attempt: Duration::from_secs(raw.reconnect_timeout_per_attempt_secs),
            },
            auth: AuthSettings {
                mode: raw.auth_mode,
                verify_url: raw.auth_verify_url,
                timeout: Duration::from_secs(raw.auth_timeout_secs),
            },
        })
    }
}

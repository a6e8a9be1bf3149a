//! Worker pool scaling configuration, deserialized into
//! [`crate::application::workers::WorkerPoolConfig`] at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::workers::WorkerPoolConfig;

/// Serializable mirror of [`WorkerPoolConfig`]; durations are expressed in
/// milliseconds/seconds for YAML readability and converted at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolSettings {
    #[serde(default = "default_min_workers")]
    pub min_workers: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_scale_up_threshold")]
    pub scale_up_threshold: f64,
    #[serde(default = "default_scale_up_cooldown_secs")]
    pub scale_up_cooldown_secs: u64,
    #[serde(default = "default_scale_down_threshold")]
    pub scale_down_threshold: f64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_consumer_prefetch")]
    pub consumer_prefetch: u16,
    /// Grace period the pool waits for in-flight handlers on shutdown
    /// before hard-aborting stragglers.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerPoolSettings {
    fn default() -> Self {
        Self {
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            scale_up_threshold: default_scale_up_threshold(),
            scale_up_cooldown_secs: default_scale_up_cooldown_secs(),
            scale_down_threshold: default_scale_down_threshold(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            consumer_prefetch: default_consumer_prefetch(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl WorkerPoolSettings {
    /// Converts to the runtime [`WorkerPoolConfig`] consumed by
    /// `WorkerPoolManager`.
    #[must_use]
    pub fn to_worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            scale_up_threshold: self.scale_up_threshold,
            scale_up_cooldown: Duration::from_secs(self.scale_up_cooldown_secs),
            scale_down_threshold: self.scale_down_threshold,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            consumer_prefetch: self.consumer_prefetch,
        }
    }

    /// The configured shutdown grace period.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

const fn default_min_workers() -> usize {
    2
}

const fn default_max_workers() -> usize {
    8
}

const fn default_scale_up_threshold() -> f64 {
    0.8
}

const fn default_scale_up_cooldown_secs() -> u64 {
    30
}

const fn default_scale_down_threshold() -> f64 {
    0.2
}

const fn default_heartbeat_interval_secs() -> u64 {
    10
}

const fn default_consumer_prefetch() -> u16 {
    1
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

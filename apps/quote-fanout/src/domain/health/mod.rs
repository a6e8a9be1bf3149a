//! Connection Pool Health Classification
//!
//! Pure function turning a snapshot of pool-wide load and error statistics
//! into one of four health bands. The task that samples these numbers on an
//! interval and publishes them lives in `application::services`.

use serde::{Deserialize, Serialize};

/// Health band reported at `/healthz` and tracked as a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Error rate and load are both within normal bounds.
    Healthy,
    /// Elevated error rate or load; still serving traffic.
    Degraded,
    /// Error rate or load has crossed into the danger zone.
    Unhealthy,
    /// No connections to sample, or the monitor hasn't run yet.
    Unknown,
}

impl HealthStatus {
    /// Short machine-readable label, as used in the health response body.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

/// Thresholds the health monitor classifies against.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// Error rate (0.0-1.0) above which the pool is `Degraded`.
    pub degraded_error_rate: f64,
    /// Error rate above which the pool is `Unhealthy`.
    pub unhealthy_error_rate: f64,
    /// Load ratio (active connections / capacity) above which the pool is `Degraded`.
    pub degraded_load_ratio: f64,
    /// Load ratio above which the pool is `Unhealthy`.
    pub unhealthy_load_ratio: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            degraded_error_rate: 0.05,
            unhealthy_error_rate: 0.20,
            degraded_load_ratio: 0.80,
            unhealthy_load_ratio: 0.95,
        }
    }
}

/// Point-in-time snapshot fed into [`classify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSnapshot {
    /// Connections currently active.
    pub active_connections: u32,
    /// Configured connection capacity (0 means unbounded/unknown).
    pub capacity: u32,
    /// Sends attempted since the last sample.
    pub sends_attempted: u64,
    /// Sends that failed since the last sample.
    pub sends_failed: u64,
}

impl PoolSnapshot {
    fn error_rate(self) -> f64 {
        if self.sends_attempted == 0 {
            0.0
        } else {
            self.sends_failed as f64 / self.sends_attempted as f64
        }
    }

    fn load_ratio(self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.active_connections) / f64::from(self.capacity)
        }
    }
}

/// Classify a snapshot against `thresholds`. The worse of the error-rate
/// band and the load-ratio band wins.
#[must_use]
pub fn classify(snapshot: PoolSnapshot, thresholds: HealthThresholds) -> HealthStatus {
    let error_rate = snapshot.error_rate();
    let load_ratio = snapshot.load_ratio();

    let error_band = if error_rate >= thresholds.unhealthy_error_rate {
        HealthStatus::Unhealthy
    } else if error_rate >= thresholds.degraded_error_rate {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let load_band = if load_ratio >= thresholds.unhealthy_load_ratio {
        HealthStatus::Unhealthy
    } else if load_ratio >= thresholds.degraded_load_ratio {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    worse_of(error_band, load_band)
}

const fn severity(status: HealthStatus) -> u8 {
    match status {
        HealthStatus::Healthy => 0,
        HealthStatus::Degraded => 1,
        HealthStatus::Unhealthy => 2,
        HealthStatus::Unknown => 3,
    }
}

const fn worse_of(a: HealthStatus, b: HealthStatus) -> HealthStatus {
    if severity(a) >= severity(b) {
        a
    } else {
        b
    }
}

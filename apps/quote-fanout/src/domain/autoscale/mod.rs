//! Worker-Pool Scaling Decisions
//!
//! Pure evaluation of whether the connection-handling worker pool should
//! scale up, scale down, or hold steady, given a load snapshot and the
//! cooldown remaining since the last scaling event. The task that samples
//! load on an interval and actually resizes the pool lives in
//! `application::services`.

use std::time::Duration;

/// Tunables for [`evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct AutoscaleConfig {
    /// Load ratio above which a scale-up is considered.
    pub scale_up_threshold: f64,
    /// Load ratio below which a scale-down is considered.
    pub scale_down_threshold: f64,
    /// CPU utilization (0.0-1.0) that must be cleared to scale up.
    pub cpu_gate: f64,
    /// Memory utilization (0.0-1.0) that must be cleared to scale up.
    pub memory_gate: f64,
    /// Minimum time between scaling events.
    pub cooldown: Duration,
    /// Floor on worker count.
    pub min_workers: u32,
    /// Ceiling on worker count.
    pub max_workers: u32,
}

impl Default for AutoscaleConfig {
    fn default() -> Self {
        Self {
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.3,
            cpu_gate: 0.85,
            memory_gate: 0.50,
            cooldown: Duration::from_secs(30),
            min_workers: 1,
            max_workers: 16,
        }
    }
}

/// Point-in-time load sample fed into [`evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct LoadSample {
    /// Connections currently active.
    pub active_connections: u32,
    /// Worker pool capacity right now.
    pub current_workers: u32,
    /// Connections one worker is considered able to serve.
    pub connections_per_worker: u32,
    /// Host CPU utilization, 0.0-1.0.
    pub cpu_utilization: f64,
    /// Host memory utilization, 0.0-1.0.
    pub memory_utilization: f64,
    /// Time elapsed since the last scaling event resolved.
    pub since_last_scaling: Duration,
}

impl LoadSample {
    fn load_ratio(self) -> f64 {
        let capacity = self.current_workers.saturating_mul(self.connections_per_worker.max(1));
        if capacity == 0 {
            0.0
        } else {
            f64::from(self.active_connections) / f64::from(capacity)
        }
    }
}

/// Outcome of evaluating a [`LoadSample`] against [`AutoscaleConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingDecision {
    /// Add one worker.
    ScaleUp,
    /// Remove one worker.
    ScaleDown,
    /// No change.
    Hold,
}

/// Decide whether to scale the worker pool given the current `sample`.
///
/// Scale-up requires load over `scale_up_threshold` AND both resource gates
/// clear (there is headroom to actually run another worker) AND the
/// cooldown has elapsed AND `current_workers < max_workers`. Scale-down
/// requires load under `scale_down_threshold`, cooldown elapsed, and
/// `current_workers > min_workers`. Resource gates only apply to scaling up;
/// scaling down is always safe from a resource standpoint.
#[must_use]
pub fn evaluate(sample: LoadSample, config: AutoscaleConfig) -> ScalingDecision {
    if sample.since_last_scaling < config.cooldown {
        return ScalingDecision::Hold;
    }

    let load_ratio = sample.load_ratio();

    if load_ratio > config.scale_up_threshold
        && sample.cpu_utilization < config.cpu_gate
        && sample.memory_utilization < config.memory_gate
        && sample.current_workers < config.max_workers
    {
        return ScalingDecision::ScaleUp;
    }

    if load_ratio < config.scale_down_threshold && sample.current_workers > config.min_workers {
        return ScalingDecision::ScaleDown;
    }

    ScalingDecision::Hold
}

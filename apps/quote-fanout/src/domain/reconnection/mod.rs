//! Reconnection Scheduling Policy
//!
//! The three backoff strategies the fan-out layer's reconnection manager
//! needs to schedule client-facing reconnection attempts: pure delay math
//! plus a priority-queue entry type. The manager itself (the task that
//! owns the queue and runs attempts) lives in `application::services`.

use std::cmp::Ordering;
use std::time::Duration;

use rand::Rng;

use crate::domain::connection::ConnectionId;

/// Backoff strategy for spacing reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStrategy {
    /// Delay grows by a fixed increment each attempt.
    Linear,
    /// Delay doubles each attempt (multiplier fixed at 2.0 per spec).
    Exponential,
    /// Delay is constant across attempts.
    Fixed,
}

/// Tunables for [`ReconnectionPolicy`].
#[derive(Debug, Clone)]
pub struct ReconnectionConfig {
    /// Backoff shape.
    pub strategy: ReconnectStrategy,
    /// Delay before the first attempt (and the fixed delay under `Fixed`).
    pub base_delay: Duration,
    /// Upper bound any computed delay is clamped to.
    pub max_delay: Duration,
    /// Symmetric jitter fraction applied to the computed delay (e.g. `0.25` for ±25%).
    pub jitter_factor: f64,
    /// Attempts allowed before giving up.
    pub max_attempts: u32,
    /// Budget for a single attempt (connect + auth) before it's treated as a failure.
    pub timeout_per_attempt: Duration,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.25,
            max_attempts: 5,
            timeout_per_attempt: Duration::from_secs(10),
        }
    }
}

/// Stateless delay computation for a given attempt number (1-based).
#[must_use]
pub fn delay_for_attempt(config: &ReconnectionConfig, attempt: u32) -> Duration {
    let base_millis = config.base_delay.as_millis() as f64;
    let raw_millis = match config.strategy {
        ReconnectStrategy::Fixed => base_millis,
        ReconnectStrategy::Linear => base_millis * f64::from(attempt),
        ReconnectStrategy::Exponential => base_millis * 2f64.powi(i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX)),
    };
    let capped = raw_millis.min(config.max_delay.as_millis() as f64);
    Duration::from_millis(capped.round() as u64)
}

/// Apply symmetric jitter to `delay`, clamped to stay non-negative and
/// never exceed `max_delay`.
#[must_use]
pub fn jittered(delay: Duration, jitter_factor: f64, max_delay: Duration) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }
    let base = delay.as_millis() as f64;
    let spread = base * jitter_factor;
    let mut rng = rand::rng();
    let offset: f64 = rng.random_range(-spread..=spread);
    let adjusted = (base + offset).max(0.0).min(max_delay.as_millis() as f64);
    Duration::from_millis(adjusted.round() as u64)
}

/// Relative urgency of a queued reconnection attempt. Higher sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReconnectionPriority {
    /// Best-effort, can wait behind other work.
    Low,
    /// Default priority for ordinary drops.
    Normal,
    /// Jump the queue, e.g. for connections the health monitor flagged.
    High,
}

/// One scheduled reconnection attempt.
#[derive(Debug, Clone)]
pub struct ReconnectionAttempt {
    /// Which connection this attempt is for.
    pub connection_id: ConnectionId,
    /// Queue priority.
    pub priority: ReconnectionPriority,
    /// 1-based attempt counter for this connection.
    pub attempt_number: u32,
}

impl PartialEq for ReconnectionAttempt {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.attempt_number == other.attempt_number
    }
}
impl Eq for ReconnectionAttempt {}

impl PartialOrd for ReconnectionAttempt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReconnectionAttempt {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; higher priority and fewer prior attempts go first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.attempt_number.cmp(&self.attempt_number))
    }
}

/// Per-connection reconnection state machine: tracks attempt count and
/// hands back the next delay, or signals the attempt budget is exhausted.
#[derive(Debug, Clone)]
pub struct ReconnectionPolicy {
    config: ReconnectionConfig,
    attempts_made: u32,
}

impl ReconnectionPolicy {
    /// Start a fresh policy from `config`.
    #[must_use]
    pub const fn new(config: ReconnectionConfig) -> Self {
        Self {
            config,
            attempts_made: 0,
        }
    }

    /// Compute and apply the next delay, or `None` if `max_attempts` is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts_made >= self.config.max_attempts {
            return None;
        }
        self.attempts_made += 1;
        let raw = delay_for_attempt(&self.config, self.attempts_made);
        Some(jittered(raw, self.config.jitter_factor, self.config.max_delay))
    }

    /// Number of attempts made so far.
    #[must_use]
    pub const fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Reset after a successful reconnection.
    pub const fn reset(&mut self) {
        self.attempts_made = 0;
    }

    /// Whether another attempt is still permitted.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.attempts_made < self.config.max_attempts
    }

    /// Per-attempt timeout from the underlying config.
    #[must_use]
    pub const fn timeout_per_attempt(&self) -> Duration {
        self.config.timeout_per_attempt
    }
}

/// Running totals the reconnection manager reports as metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectionMetrics {
    /// Total attempts started.
    pub total_attempts: u64,
    /// Attempts that ended in a successful reconnect.
    pub successes: u64,
    /// Attempts that ended in failure (including exhausted budgets).
    pub failures: u64,
    /// Running average reconnect duration in milliseconds.
    pub average_reconnect_time_ms: f64,
    /// Attempts currently queued.
    pub queue_size: usize,
}

impl ReconnectionMetrics {
    /// Fold in the outcome of one attempt.
    pub fn record(&mut self, succeeded: bool, duration: Duration) {
        self.total_attempts += 1;
        if succeeded {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        let n = self.total_attempts as f64;
        let sample = duration.as_secs_f64() * 1000.0;
        self.average_reconnect_time_ms += (sample - self.average_reconnect_time_ms) / n;
    }
}

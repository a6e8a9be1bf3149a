//! Per-Connection Circuit Breaker
//!
//! Same three-state machine as the order-processing engine's service-level
//! breaker, but tripped by *consecutive* send failures rather than a
//! sliding-window failure rate: a single slow/broken WebSocket connection
//! should not need twenty samples before the pool stops paying for it.
//! One instance is allocated per [`crate::domain::connection::PooledConnection`],
//! so there is no shared lock across connections.
//!
//! ```text
//! CLOSED  --(N consecutive failures)-->  OPEN
//! OPEN    --(recovery_timeout elapsed)-->  HALF_OPEN
//! HALF_OPEN --(trial success)-->  CLOSED
//! HALF_OPEN --(trial failure)-->  OPEN
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Current state of a connection's circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Sends are attempted normally.
    Closed,
    /// Sends are rejected outright.
    Open,
    /// A bounded number of trial sends are permitted.
    HalfOpen,
}

/// Tunables for [`ConnectionCircuitBreaker`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive send failures required to open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays `OPEN` before allowing a trial.
    pub recovery_timeout: Duration,
    /// Number of trial sends permitted while `HALF_OPEN`.
    pub half_open_trial_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_trial_calls: 1,
        }
    }
}

/// Circuit breaker guarding sends to a single pooled connection.
#[derive(Debug)]
pub struct ConnectionCircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    consecutive_failures: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
    half_open_trials_used: AtomicU32,
}

impl ConnectionCircuitBreaker {
    /// Create a breaker starting in the `CLOSED` state.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            opened_at: RwLock::new(None),
            half_open_trials_used: AtomicU32::new(0),
        }
    }

    /// Current state, first resolving any time-based `OPEN -> HALF_OPEN`
    /// transition.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.maybe_recover();
        *self.state.read()
    }

    /// Whether a send should be attempted right now.
    #[must_use]
    pub fn is_call_permitted(&self) -> bool {
        self.maybe_recover();
        match *self.state.read() {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                self.half_open_trials_used.load(Ordering::Relaxed) < self.config.half_open_trial_calls
            }
        }
    }

    /// Record a successful send.
    pub fn record_success(&self) {
        let state = *self.state.read();
        match state {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                self.half_open_trials_used.fetch_add(1, Ordering::Relaxed);
                self.transition_to_closed();
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed send.
    pub fn record_failure(&self) {
        let state = *self.state.read();
        match state {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_trials_used.fetch_add(1, Ordering::Relaxed);
                self.transition_to_open();
            }
            CircuitState::Open => {}
        }
    }

    fn maybe_recover(&self) {
        let is_open = *self.state.read() == CircuitState::Open;
        if !is_open {
            return;
        }
        let should_transition = self
            .opened_at
            .read()
            .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
        if should_transition {
            let mut state = self.state.write();
            if *state == CircuitState::Open {
                *state = CircuitState::HalfOpen;
                self.half_open_trials_used.store(0, Ordering::Relaxed);
            }
        }
    }

    fn transition_to_open(&self) {
        *self.state.write() = CircuitState::Open;
        *self.opened_at.write() = Some(Instant::now());
    }

    fn transition_to_closed(&self) {
        *self.state.write() = CircuitState::Closed;
        *self.opened_at.write() = None;
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.half_open_trials_used.store(0, Ordering::Relaxed);
    }
}

impl Default for ConnectionCircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = ConnectionCircuitBreaker::default();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.is_call_permitted());
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        });
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_call_permitted());
    }

    #[test]
    fn success_resets_consecutive_failure_count() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        });
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_opens_after_recovery_timeout() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(10),
            half_open_trial_calls: 1,
        });
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.is_call_permitted());
    }

    #[test]
    fn half_open_trial_success_closes_circuit() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(10),
            half_open_trial_calls: 1,
        });
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_trial_failure_reopens_circuit() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(10),
            half_open_trial_calls: 1,
        });
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_limits_trial_calls() {
        let cb = ConnectionCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(10),
            half_open_trial_calls: 2,
        });
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_call_permitted());
        // Simulate two trial sends in flight before either resolves.
        cb.half_open_trials_used.fetch_add(1, Ordering::Relaxed);
        assert!(cb.is_call_permitted());
        cb.half_open_trials_used.fetch_add(1, Ordering::Relaxed);
        assert!(!cb.is_call_permitted());
    }
}

//! Per-worker circuit breaker registry.
//!
//! Reuses the `Closed`/`Open`/`HalfOpen` state machine from
//! [`crate::resilience::CircuitBreaker`], keyed by worker id, so each
//! worker's calls to the execution capability trip independently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Lazily creates and hands out one [`CircuitBreaker`] per worker id.
pub struct WorkerCircuitBreakers {
    config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl WorkerCircuitBreakers {
    /// Builds a registry using `config` for every worker's breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `worker_id`, creating it on first use.
    #[must_use]
    pub fn get_or_create(&self, worker_id: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self
            .breakers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(worker_id)
        {
            return existing.clone();
        }

        self.breakers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(worker_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(worker_id.to_string(), self.config.clone())))
            .clone()
    }
}

impl Default for WorkerCircuitBreakers {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

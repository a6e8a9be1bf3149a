//! Resilience patterns for external service calls.
//!
//! This module provides the circuit breaker state machine shared by the
//! worker pool's per-worker registry and any adapter that wants one.

mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};

//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the ambient stack (config,
//! health, metrics, telemetry).

/// Token verification adapters (simulated and HTTP-backed).
pub mod auth;

/// Quote catalog and the oscillator task that perturbs it.
pub mod catalog;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Connection pool: bookkeeping, maintenance, and scaling.
pub mod pool;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// WebSocket upgrade and per-connection fan-out handler.
pub mod websocket;

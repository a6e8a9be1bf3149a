#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Quote Fan-out - Realtime Asset-Quote Multiplexer
//!
//! Maintains a server-side catalog of asset quotes, oscillates a random
//! subset of prices on a timer, and pushes JSON-Patch deltas to
//! authenticated WebSocket subscribers through a pooled, circuit-broken,
//! auto-scaled connection layer.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure quote, patch, circuit-breaker, health, autoscale, and
//!   reconnection types with no I/O
//! - **Application**: Port definitions and the background services
//!   (`health_monitor`, `autoscaler`, `reconnection_manager`) that
//!   orchestrate them
//! - **Infrastructure**: Adapters and external integrations
//!   - `catalog`: the quote catalog and the oscillator task
//!   - `pool`: connection bookkeeping, maintenance, scaling
//!   - `auth`: bearer-token verification
//!   - `websocket`: the `/quotes` upgrade handler
//!   - `config`, `health`, `metrics`, `telemetry`: the ambient stack
//!
//! # Data Flow
//!
//! ```text
//! Oscillator tick ──► QuoteCatalog ──► snapshot ──┬─► conn 1 (diff + patch)
//!                                                   ├─► conn 2 (diff + patch)
//!                                                   └─► conn N (diff + patch)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core quote fan-out types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{ClientInfo, ConnectionId, PooledConnection};
pub use domain::health::HealthStatus;
pub use domain::quote::AssetQuote;

// Application ports
pub use application::ports::{
    AuthError, PoolObserverPort, ReconnectionPort, ScalingPort, VerifiedIdentity, VerifyTokenPort,
};

// Infrastructure config
pub use infrastructure::config::{
    AppConfig, AuthMode, AuthSettings, ConfigError, HealthMonitorSettings, ServerSettings,
};

// Catalog and oscillator (for integration tests)
pub use infrastructure::catalog::{Oscillator, OscillatorConfig, QuoteCatalog, QuoteSnapshot};

// Connection pool (for integration tests)
pub use infrastructure::pool::{ConnectionPool, PoolConfig};

// Auth adapters
pub use infrastructure::auth::{HttpTokenVerifier, SimulatedTokenVerifier};

// WebSocket router (for integration tests)
pub use infrastructure::websocket::{router as quotes_router, WebSocketState};

// Health server
pub use infrastructure::health::{
    HealthServer, HealthServerError, HealthServerState, SharedHealthStatus,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{init as init_telemetry, TelemetryConfig, TelemetryGuard};

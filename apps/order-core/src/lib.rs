// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
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

//! Order Core - Idempotent Order Submission and Processing
//!
//! Accepts order submissions exactly once, validates and prices them
//! against market/position/risk context, persists the resulting
//! aggregate, and hands execution off to a message-bus-driven worker
//! pool that publishes position-update events downstream.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order`: Order aggregate and status lifecycle
//!   - `idempotency`: Exactly-once submission keys
//!   - `validation`: Business-rule checks over an order and market context
//!   - `risk`: Composite risk scoring and manual-approval gating
//!   - `pricing`: Execution price/strategy recommendation
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (market data, position,
//!     pricing data, risk data, message bus, event publisher, execution)
//!   - `use_cases`: `SubmitOrder`, `OutboxSweeper`, `DlqRecoveryHandler`
//!   - `workers`: Process-order worker pool, retry-tier routing, circuit breakers
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `messaging`: `lapin`-backed message bus adapter
//!   - `persistence`: Order/idempotency repositories (in-memory, Turso)
//!   - `external`: Simulated market-data/position/pricing/risk/execution clients
//!   - `config`: Layered configuration
//!   - `health`: Liveness/readiness HTTP surface and Prometheus metrics
//!
//! - **Resilience**: Circuit breaker state machine shared by adapters and workers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Resilience primitives shared across adapters and the worker pool.
pub mod resilience;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order::{CreateOrderCommand, Order, OrderError, OrderEvent, OrderRepository, OrderStatus};
pub use domain::idempotency::{IdempotencyCheck, IdempotencyKey, IdempotencyRecord, IdempotencyRepository};
pub use domain::shared::{BrokerId, Money, OrderId, Quantity, Symbol, Timestamp, WorkerId};

// Application re-exports
pub use application::dto::{OrderDto, SubmitOrderRequestDto, SubmitOrderResponseDto};
pub use application::error::{CoreError, ErrorKind};
pub use application::ports::{
    BusEventPublisher, EventPublisherPort, IMarketDataClient, IOrderExecutionClient,
    IPositionClient, IPricingDataClient, IRiskDataClient, MessageBusPort, NoOpEventPublisher,
};
pub use application::use_cases::{
    DlqRecoveryHandler, OutboxSweeperUseCase, SubmitOrderRequest, SubmitOrderResult,
    SubmitOrderUseCase,
};
pub use application::workers::{OrderProcessingHandler, WorkerCircuitBreakers, WorkerPoolConfig, WorkerPoolManager};

// Resilience re-exports
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};

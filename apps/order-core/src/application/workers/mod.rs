//! Process-order worker pool (C7): per-delivery handling, retry-tier
//! routing, a per-worker circuit breaker registry, and the Worker
//! Manager that scales and supervises the pool.

mod circuit_registry;
mod handler;
mod manager;
mod retry;

pub use circuit_registry::WorkerCircuitBreakers;
pub use handler::OrderProcessingHandler;
pub use manager::{HandlerFactory, WorkerHealth, WorkerPoolConfig, WorkerPoolManager, WorkerPoolMetrics};
pub use retry::{retries_exhausted, retry_queue_for_attempt, MAX_RETRIES, RETRY_TIERS};

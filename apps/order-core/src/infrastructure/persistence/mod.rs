//! Persistence Adapters
//!
//! Implementations of [`crate::domain::order::OrderRepository`] and
//! [`crate::domain::idempotency::IdempotencyRepository`].
//!
//! - `in_memory`: process-local store for local development and tests.
//! - `turso`: Turso-backed store for production deployments.

pub mod in_memory;
pub mod turso;

pub use in_memory::{InMemoryIdempotencyRepository, InMemoryOrderRepository};
pub use turso::{TursoIdempotencyRepository, TursoOrderRepository};

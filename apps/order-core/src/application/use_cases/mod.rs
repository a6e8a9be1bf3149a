//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod dlq_recovery;
mod outbox_sweeper;
mod submit_order;

pub use dlq_recovery::DlqRecoveryHandler;
pub use outbox_sweeper::OutboxSweeperUseCase;
pub use submit_order::{SubmitOrderRequest, SubmitOrderResult, SubmitOrderUseCase};

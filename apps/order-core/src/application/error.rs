//! Top-level application error.
//!
//! Use cases match on [`ErrorKind`], not on concrete lower-layer error
//! types, so that a new port adapter only needs a `From` impl here rather
//! than a matching arm in every use case.

use thiserror::Error;

use crate::domain::idempotency::IdempotencyError;
use crate::domain::order::OrderError;

/// Error kind classification shared by every use case and worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request fails domain invariants or enum parse.
    InvalidInput,
    /// A PENDING idempotency key already exists for the same user.
    IdempotencyConflict,
    /// Symbol/price/quantity/risk rejection.
    ValidationError,
    /// DB, bus, or external-client timeout or 5xx; retryable.
    TransientIO,
    /// Schema violation, non-existent row on update; not retryable.
    PermanentIO,
    /// A downstream circuit breaker is open.
    CircuitOpen,
    /// Programmer error / broken invariant.
    Fatal,
}

/// Classified error surfaced by use cases and the worker pool.
#[derive(Debug, Error)]
pub enum CoreError {
    /// See [`ErrorKind::InvalidInput`].
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// See [`ErrorKind::IdempotencyConflict`].
    #[error("request already in progress: {0}")]
    IdempotencyConflict(String),
    /// See [`ErrorKind::ValidationError`].
    #[error("validation failed: {0}")]
    ValidationError(String),
    /// See [`ErrorKind::TransientIO`].
    #[error("transient failure: {0}")]
    TransientIO(String),
    /// See [`ErrorKind::PermanentIO`].
    #[error("permanent failure: {0}")]
    PermanentIO(String),
    /// See [`ErrorKind::CircuitOpen`].
    #[error("circuit open: {0}")]
    CircuitOpen(String),
    /// See [`ErrorKind::Fatal`].
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Classifies this error into one of the seven kinds use cases branch
    /// on.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::IdempotencyConflict(_) => ErrorKind::IdempotencyConflict,
            Self::ValidationError(_) => ErrorKind::ValidationError,
            Self::TransientIO(_) => ErrorKind::TransientIO,
            Self::PermanentIO(_) => ErrorKind::PermanentIO,
            Self::CircuitOpen(_) => ErrorKind::CircuitOpen,
            Self::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// True if a worker should route this failure to a retry queue rather
    /// than straight to the DLQ.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientIO | ErrorKind::CircuitOpen)
    }
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound { .. } => Self::PermanentIO(err.to_string()),
            OrderError::InvalidParameters { .. } => Self::InvalidInput(err.to_string()),
            OrderError::InsufficientPosition { .. } | OrderError::PriceOutOfTolerance { .. } => {
                Self::ValidationError(err.to_string())
            }
            OrderError::InvalidStateTransition { .. }
            | OrderError::CannotExecute { .. }
            | OrderError::CannotCancel { .. }
            | OrderError::DuplicateOrderId { .. } => Self::Fatal(err.to_string()),
        }
    }
}

impl From<IdempotencyError> for CoreError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::Conflict { .. } => Self::IdempotencyConflict(err.to_string()),
            IdempotencyError::NotFound { .. } => Self::PermanentIO(err.to_string()),
            IdempotencyError::AlreadyTerminal { .. } | IdempotencyError::InvalidTtl { .. } => {
                Self::Fatal(err.to_string())
            }
        }
    }
}

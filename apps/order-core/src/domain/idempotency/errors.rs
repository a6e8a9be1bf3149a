//! Idempotency domain errors.

use std::fmt;

/// Errors that can occur while creating or transitioning an idempotency
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyError {
    /// No record exists for the given key.
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A PENDING record for this key already exists from another in-flight
    /// request on the same submission.
    Conflict {
        /// The key in conflict.
        key: String,
    },

    /// The record has already reached a terminal status and cannot be
    /// completed or failed again.
    AlreadyTerminal {
        /// The key in question.
        key: String,
    },

    /// `expires_at` was not after `created_at`.
    InvalidTtl {
        /// Description of the violation.
        message: String,
    },
}

impl fmt::Display for IdempotencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "idempotency key not found: {key}"),
            Self::Conflict { key } => {
                write!(f, "idempotency key already pending from another request: {key}")
            }
            Self::AlreadyTerminal { key } => {
                write!(f, "idempotency key already has a terminal result: {key}")
            }
            Self::InvalidTtl { message } => write!(f, "invalid idempotency TTL: {message}"),
        }
    }
}

impl std::error::Error for IdempotencyError {}

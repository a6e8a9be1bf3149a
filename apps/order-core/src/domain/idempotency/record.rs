//! Idempotency record entity.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Timestamp;

use super::errors::IdempotencyError;
use super::key::IdempotencyKey;
use super::status::IdempotencyStatus;

/// Default time-to-live for a pending idempotency record: 24 hours.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// An idempotency key's backing record.
///
/// Created PENDING by the submit use case; mutated exactly once to
/// COMPLETED or FAILED; garbage-collected once expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    key: String,
    user_id: String,
    status: IdempotencyStatus,
    created_at: Timestamp,
    expires_at: Timestamp,
    order_id: Option<String>,
    result: Option<String>,
}

impl IdempotencyRecord {
    /// Creates a new PENDING record with the default 24h TTL.
    #[must_use]
    pub fn new_pending(key: &IdempotencyKey, user_id: impl Into<String>) -> Self {
        Self::new_pending_with_ttl(key, user_id, Duration::hours(DEFAULT_TTL_HOURS))
    }

    /// Creates a new PENDING record with an explicit TTL.
    #[must_use]
    pub fn new_pending_with_ttl(
        key: &IdempotencyKey,
        user_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let created_at = Timestamp::now();
        let expires_at = Timestamp::from(created_at.as_datetime() + ttl);

        Self {
            key: key.as_str().to_string(),
            user_id: user_id.into(),
            status: IdempotencyStatus::Pending,
            created_at,
            expires_at,
            order_id: None,
            result: None,
        }
    }

    /// The key this record belongs to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The owning user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> IdempotencyStatus {
        self.status
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> &Timestamp {
        &self.expires_at
    }

    /// The order id produced by a completed submission, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    /// The stored result string (success payload or error message).
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Returns true if `expires_at` is in the past relative to `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.expires_at.as_datetime() < now.as_datetime()
    }

    /// Marks the record COMPLETED with the given order id and result.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::AlreadyTerminal`] if the record already
    /// has a terminal status.
    pub fn complete(
        &mut self,
        order_id: impl Into<String>,
        result: impl Into<String>,
    ) -> Result<(), IdempotencyError> {
        if self.status.is_terminal() {
            return Err(IdempotencyError::AlreadyTerminal {
                key: self.key.clone(),
            });
        }

        self.status = IdempotencyStatus::Completed;
        self.order_id = Some(order_id.into());
        self.result = Some(result.into());
        Ok(())
    }

    /// Marks the record FAILED with the given error result.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::AlreadyTerminal`] if the record already
    /// has a terminal status.
    pub fn fail(&mut self, result: impl Into<String>) -> Result<(), IdempotencyError> {
        if self.status.is_terminal() {
            return Err(IdempotencyError::AlreadyTerminal {
                key: self.key.clone(),
            });
        }

        self.status = IdempotencyStatus::Failed;
        self.result = Some(result.into());
        Ok(())
    }

    /// Marks the record EXPIRED. Called by the cleanup sweep.
    pub fn expire(&mut self) {
        self.status = IdempotencyStatus::Expired;
    }

    /// Reconstructs a record from persisted fields, bypassing the
    /// PENDING-only constructors. Used by repository adapters reading rows
    /// back from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        key: String,
        user_id: String,
        status: IdempotencyStatus,
        created_at: Timestamp,
        expires_at: Timestamp,
        order_id: Option<String>,
        result: Option<String>,
    ) -> Self {
        Self {
            key,
            user_id,
            status,
            created_at,
            expires_at,
            order_id,
            result,
        }
    }
}

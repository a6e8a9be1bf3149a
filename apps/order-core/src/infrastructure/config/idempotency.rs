//! Idempotency-key retention configuration.

use serde::{Deserialize, Serialize};

use crate::domain::idempotency::DEFAULT_TTL_HOURS;

/// Idempotency configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Hours a PENDING/COMPLETED/FAILED record is retained before
    /// [`crate::domain::idempotency::IdempotencyRepository::cleanup_expired`]
    /// may reclaim it.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

const fn default_ttl_hours() -> i64 {
    DEFAULT_TTL_HOURS
}

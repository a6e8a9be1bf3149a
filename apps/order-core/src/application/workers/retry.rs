//! Retry-tier queue selection for the process-order worker pool.

/// Retry-tier queues, in escalating backoff order. Each queue's TTL +
/// dead-letter-exchange (declared by the bus adapter) routes an expired
/// message back to `orders.processing` for redelivery.
pub const RETRY_TIERS: [&str; 4] = [
    "orders.retry.5m",
    "orders.retry.15m",
    "orders.retry.1h",
    "orders.retry.6h",
];

/// Maximum retry attempts before an order is routed to `orders.dlq`
/// instead of a retry tier.
pub const MAX_RETRIES: u32 = RETRY_TIERS.len() as u32;

/// Resolves the retry queue for the given (pre-increment) retry count.
///
/// `tier = min(retry_count, RETRY_TIERS.len() - 1)`, so the escalation
/// chain ends at `6h` rather than indexing past the configured tiers.
#[must_use]
pub fn retry_queue_for_attempt(retry_count: u32) -> &'static str {
    let tier = retry_count.min(RETRY_TIERS.len() as u32 - 1) as usize;
    RETRY_TIERS[tier]
}

/// Whether `retry_count` has exhausted the retry budget and should be
/// routed to the dead-letter queue instead of a retry tier.
#[must_use]
pub const fn retries_exhausted(retry_count: u32) -> bool {
    retry_count >= MAX_RETRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_escalates_with_attempt_count() {
        assert_eq!(retry_queue_for_attempt(0), "orders.retry.5m");
        assert_eq!(retry_queue_for_attempt(1), "orders.retry.15m");
        assert_eq!(retry_queue_for_attempt(2), "orders.retry.1h");
        assert_eq!(retry_queue_for_attempt(3), "orders.retry.6h");
    }

    #[test]
    fn tier_caps_at_last_queue_beyond_configured_attempts() {
        assert_eq!(retry_queue_for_attempt(10), "orders.retry.6h");
    }

    #[test]
    fn retries_exhausted_at_max() {
        assert!(!retries_exhausted(MAX_RETRIES - 1));
        assert!(retries_exhausted(MAX_RETRIES));
    }
}

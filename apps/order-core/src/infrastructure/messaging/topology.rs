//! Queue/exchange topology declaration.
//!
//! `orders.processing` feeds the worker pool. A failed delivery that is
//! nacked without requeue lands on `orders.dlx`/`orders.dlq` via each
//! queue's dead-letter arguments. Retry-tier queues hold a message for a
//! fixed TTL, then dead-letter it back onto `orders.processing` for
//! redelivery — see [`crate::application::workers::retry`].

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{Channel, ExchangeKind};

use crate::application::ports::BusError;

/// The dead-letter exchange all processing/retry queues route into on a
/// non-requeued nack.
pub const DEAD_LETTER_EXCHANGE: &str = "orders.dlx";
/// Terminal queue for messages that exhausted retries or were explicitly
/// dropped; drained by the DLQ-recovery tool.
pub const DEAD_LETTER_QUEUE: &str = "orders.dlq";
/// Primary queue consumed by the order-processing worker pool.
pub const PROCESSING_QUEUE: &str = "orders.processing";

/// Retry-tier queue names paired with their redelivery delay, matching
/// [`crate::application::workers::retry::RETRY_TIERS`].
pub const RETRY_TIER_QUEUES: [(&str, u32); 4] = [
    ("orders.retry.5m", 5 * 60 * 1000),
    ("orders.retry.15m", 15 * 60 * 1000),
    ("orders.retry.1h", 60 * 60 * 1000),
    ("orders.retry.6h", 6 * 60 * 60 * 1000),
];

/// Downstream queues produced by the event publisher and worker pipeline.
pub const DOWNSTREAM_QUEUES: [&str; 4] = [
    "positions.updates",
    "orders.failed",
    "orders.cancelled",
    "orders.status",
];

fn bus_err(context: &str, e: lapin::Error) -> BusError {
    BusError::ConsumeFailed(format!("{context}: {e}"))
}

/// Declares the full exchange/queue topology on `channel`. Idempotent —
/// safe to call on every adapter startup.
///
/// # Errors
///
/// Returns [`BusError::ConsumeFailed`] if any declare/bind call fails.
pub async fn declare_topology(channel: &Channel) -> Result<(), BusError> {
    channel
        .exchange_declare(
            DEAD_LETTER_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| bus_err("declare dlx exchange", e))?;

    channel
        .queue_declare(
            DEAD_LETTER_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| bus_err("declare dlq", e))?;

    channel
        .queue_bind(
            DEAD_LETTER_QUEUE,
            DEAD_LETTER_EXCHANGE,
            DEAD_LETTER_QUEUE,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| bus_err("bind dlq", e))?;

    let mut processing_args = FieldTable::default();
    processing_args.insert(
        ShortString::from("x-dead-letter-exchange"),
        AMQPValue::LongString(LongString::from(DEAD_LETTER_EXCHANGE)),
    );
    processing_args.insert(
        ShortString::from("x-dead-letter-routing-key"),
        AMQPValue::LongString(LongString::from(DEAD_LETTER_QUEUE)),
    );
    channel
        .queue_declare(
            PROCESSING_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            processing_args,
        )
        .await
        .map_err(|e| bus_err("declare processing queue", e))?;

    for (queue, ttl_ms) in RETRY_TIER_QUEUES {
        let mut args = FieldTable::default();
        // Default exchange ("") routes strictly by routing key, so a TTL
        // expiry here dead-letters straight onto `orders.processing`.
        args.insert(
            ShortString::from("x-dead-letter-exchange"),
            AMQPValue::LongString(LongString::from("")),
        );
        args.insert(
            ShortString::from("x-dead-letter-routing-key"),
            AMQPValue::LongString(LongString::from(PROCESSING_QUEUE)),
        );
        args.insert(
            ShortString::from("x-message-ttl"),
            AMQPValue::LongInt(ttl_ms as i32),
        );
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                args,
            )
            .await
            .map_err(|e| bus_err("declare retry tier queue", e))?;
    }

    for queue in DOWNSTREAM_QUEUES {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| bus_err("declare downstream queue", e))?;
    }

    Ok(())
}

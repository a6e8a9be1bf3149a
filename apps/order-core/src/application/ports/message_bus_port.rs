//! Message bus capability (C1): durable publish/consume with queues, a
//! dead-letter exchange, headers, priorities, and a consumer prefetch
//! limit.
//!
//! The `lapin` adapter in infrastructure and an in-memory channel-backed
//! fake back this trait, matching the port/adapter split used for every
//! other external collaborator in this crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a `MessageBusPort` implementation.
#[derive(Debug, Error)]
pub enum BusError {
    /// The publish call itself failed (connection down, channel closed).
    #[error("bus publish failed: {0}")]
    PublishFailed(String),
    /// The broker connection is down and reconnection has not yet
    /// succeeded.
    #[error("bus unavailable: {0}")]
    Unavailable(String),
    /// Declaring the consumer (queue/exchange topology, QoS) failed.
    #[error("bus consume setup failed: {0}")]
    ConsumeFailed(String),
}

/// Options accompanying a single publish call.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Explicit message id; derived by the caller if omitted.
    pub message_id: Option<String>,
    /// Correlation id tying this message to an originating aggregate
    /// (typically the order id).
    pub correlation_id: Option<String>,
    /// Arbitrary header fields carried end-to-end
    /// (`event_type`, `user_id`, `symbol`, timestamps, …).
    pub headers: HashMap<String, String>,
    /// Whether the broker should persist this message across restarts.
    pub persistent: bool,
    /// Priority byte; 1 for standard traffic, higher for
    /// reconnection-triggered republish.
    pub priority: u8,
    /// Per-message TTL, used by the retry-tier queues.
    pub ttl: Option<Duration>,
}

impl PublishOptions {
    /// Standard-priority, persistent publish options carrying the given
    /// correlation id.
    #[must_use]
    pub fn standard(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            persistent: true,
            priority: 1,
            ..Self::default()
        }
    }
}

/// A message handed to a consumer handler.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Raw message body.
    pub payload: Vec<u8>,
    /// Header fields carried with the message.
    pub headers: HashMap<String, String>,
    /// Whether the broker is redelivering this message (e.g. after a
    /// retry-queue TTL expiry or a prior nack).
    pub redelivered: bool,
}

/// What a consumer handler tells the adapter to do with a delivery once
/// processing finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// Acknowledge; the broker may discard the message.
    Ack,
    /// Negative-acknowledge and requeue onto the same queue.
    NackRequeue,
    /// Negative-acknowledge without requeue; DLX policy takes over.
    NackDrop,
}

/// A consumer's per-message processing logic.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one delivery and decides its disposition.
    async fn handle(&self, message: BusMessage) -> AckDecision;
}

/// Message bus capability. Guarantees at-least-once delivery with manual
/// acknowledgement; the adapter exposes a health signal separately from
/// this trait (infrastructure-level, since it spans multiple queues).
#[async_trait]
pub trait MessageBusPort: Send + Sync {
    /// Publishes `payload` to `queue` with default (standard-priority,
    /// non-persistent) options.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::PublishFailed`] or [`BusError::Unavailable`].
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Publishes `payload` to `queue` with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::PublishFailed`] or [`BusError::Unavailable`].
    async fn publish_with_options(
        &self,
        queue: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), BusError>;

    /// Registers `handler` as the consumer for `queue` with the given
    /// prefetch (maximum unacknowledged deliveries in flight).
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ConsumeFailed`] if the consumer could not be
    /// declared.
    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError>;
}

#[async_trait]
impl<T: MessageBusPort + ?Sized> MessageBusPort for Arc<T> {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError> {
        (**self).publish(queue, payload).await
    }

    async fn publish_with_options(
        &self,
        queue: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), BusError> {
        (**self).publish_with_options(queue, payload, options).await
    }

    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        (**self).consume(queue, prefetch, handler).await
    }
}

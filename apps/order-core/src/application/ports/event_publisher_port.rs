//! Event Publisher (C8): converts domain events into bus messages for
//! downstream consumers.
//!
//! Every event is wrapped in a canonical envelope before publishing.
//! `OrderExecuted` additionally gets a flattened position-update payload
//! so position workers can consume it without understanding the general
//! envelope shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::events::OrderEvent;

use super::message_bus_port::{BusError, MessageBusPort, PublishOptions};

/// Errors surfaced while publishing domain events.
#[derive(Debug, Error)]
pub enum EventPublishError {
    /// The event could not be serialized to JSON.
    #[error("event serialization failed: {0}")]
    SerializationFailed(String),
    /// The underlying bus rejected the publish.
    #[error("event publish failed: {0}")]
    PublishFailed(#[from] BusError),
}

/// Canonical envelope wrapping every published domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The domain event's own id.
    pub event_id: Uuid,
    /// Wire type name, e.g. `ORDER_EXECUTED`.
    pub event_type: String,
    /// The order the event pertains to.
    pub aggregate_id: String,
    /// When the domain event occurred.
    pub occurred_at: DateTime<Utc>,
    /// The event's own fields, serialized as-is.
    pub event_data: Value,
    /// Bus-level message id, distinct from `event_id`.
    pub message_id: Uuid,
    /// Correlation id, set to the order id for all order events.
    pub correlation_id: String,
    /// Envelope construction time.
    pub timestamp: DateTime<Utc>,
    /// Publishing component, always `order-core`.
    pub source: &'static str,
}

/// Flattened payload for `OrderExecuted`, consumed by position workers
/// without requiring knowledge of the general envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdatePayload {
    /// Order that executed.
    pub order_id: String,
    /// Owning user.
    pub user_id: String,
    /// Symbol traded.
    pub symbol: String,
    /// Buy or sell.
    pub order_side: String,
    /// Market, limit, etc.
    pub order_type: String,
    /// Executed quantity.
    pub quantity: String,
    /// Price the order executed at.
    pub execution_price: String,
    /// When the order executed.
    pub executed_at: DateTime<Utc>,
    /// `execution_price * quantity`.
    pub total_value: String,
    /// Market price observed at submission.
    pub market_price_at_exec: Option<String>,
    /// Market data timestamp associated with the submission snapshot.
    pub market_data_timestamp: Option<DateTime<Utc>>,
    /// Message provenance metadata.
    pub message_metadata: MessageMetadata,
}

/// Provenance fields carried alongside a position-update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Bus-level message id.
    pub message_id: Uuid,
    /// Correlation id (the order id).
    pub correlation_id: String,
    /// Envelope construction time.
    pub timestamp: DateTime<Utc>,
}

/// Publishes domain events to the message bus.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publishes a batch of events, each to its own target queue. Events
    /// with no target queue (per [`OrderEvent::target_queue`]) are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EventPublishError`] if serialization or the underlying
    /// publish fails.
    async fn publish_order_events(&self, events: Vec<OrderEvent>) -> Result<(), EventPublishError>;

    /// Publishes a single event.
    ///
    /// # Errors
    ///
    /// See [`Self::publish_order_events`].
    async fn publish_order_event(&self, event: OrderEvent) -> Result<(), EventPublishError> {
        self.publish_order_events(vec![event]).await
    }
}

/// Bus-backed implementation of [`EventPublisherPort`].
pub struct BusEventPublisher<B: MessageBusPort> {
    bus: B,
}

impl<B: MessageBusPort> BusEventPublisher<B> {
    /// Builds a publisher writing through `bus`.
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    fn envelope(event: &OrderEvent) -> Result<EventEnvelope, EventPublishError> {
        let event_data = serde_json::to_value(event)
            .map_err(|e| EventPublishError::SerializationFailed(e.to_string()))?;

        Ok(EventEnvelope {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.order_id().as_str().to_string(),
            occurred_at: DateTime::<Utc>::from(*event.occurred_at()),
            event_data,
            message_id: Uuid::new_v4(),
            correlation_id: event.order_id().as_str().to_string(),
            timestamp: Utc::now(),
            source: "order-core",
        })
    }

    fn position_update(event: &OrderEvent, envelope: &EventEnvelope) -> Option<Value> {
        let OrderEvent::OrderExecuted {
            order_id,
            user_id,
            symbol,
            side,
            order_type,
            quantity,
            execution_price,
            total_value,
            market_price_at_submission,
            market_data_timestamp,
            occurred_at,
            ..
        } = event
        else {
            return None;
        };

        let payload = PositionUpdatePayload {
            order_id: order_id.as_str().to_string(),
            user_id: user_id.clone(),
            symbol: symbol.as_str().to_string(),
            order_side: side.to_string(),
            order_type: order_type.to_string(),
            quantity: format!("{:.8}", quantity.amount()),
            execution_price: format!("{:.8}", execution_price.amount()),
            executed_at: DateTime::<Utc>::from(*occurred_at),
            total_value: format!("{:.8}", total_value.amount()),
            market_price_at_exec: market_price_at_submission.map(|m| format!("{:.8}", m.amount())),
            market_data_timestamp: market_data_timestamp.map(|t| DateTime::<Utc>::from(t)),
            message_metadata: MessageMetadata {
                message_id: envelope.message_id,
                correlation_id: envelope.correlation_id.clone(),
                timestamp: envelope.timestamp,
            },
        };

        serde_json::to_value(payload).ok()
    }
}

#[async_trait]
impl<B: MessageBusPort> EventPublisherPort for BusEventPublisher<B> {
    async fn publish_order_events(&self, events: Vec<OrderEvent>) -> Result<(), EventPublishError> {
        for event in &events {
            let Some(queue) = event.target_queue() else {
                continue;
            };

            let envelope = Self::envelope(event)?;
            let body = Self::position_update(event, &envelope)
                .unwrap_or_else(|| serde_json::to_value(&envelope).unwrap_or(Value::Null));

            let payload = serde_json::to_vec(&body)
                .map_err(|e| EventPublishError::SerializationFailed(e.to_string()))?;

            let mut options = PublishOptions::standard(envelope.correlation_id.clone());
            options
                .headers
                .insert("event_type".to_string(), envelope.event_type.clone());
            options.headers.insert(
                "user_id".to_string(),
                event.order_id().as_str().to_string(),
            );
            options
                .headers
                .insert("message_id".to_string(), envelope.message_id.to_string());
            options
                .headers
                .insert("timestamp".to_string(), envelope.timestamp.to_rfc3339());

            self.bus
                .publish_with_options(queue, payload, options)
                .await?;
        }

        Ok(())
    }
}

/// No-op publisher used in tests that don't care about bus traffic.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_order_events(
        &self,
        _events: Vec<OrderEvent>,
    ) -> Result<(), EventPublishError> {
        Ok(())
    }
}

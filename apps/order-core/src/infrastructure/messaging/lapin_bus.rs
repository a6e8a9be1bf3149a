//! `lapin`-backed [`MessageBusPort`] adapter.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::ports::{
    AckDecision, BusError, BusMessage, MessageBusPort, MessageHandler, PublishOptions,
};

use super::topology::declare_topology;

/// Publishes/consumes over an AMQP 0-9-1 broker (RabbitMQ) via `lapin`.
///
/// Holds one channel for publishing; [`Self::consume`] opens a dedicated
/// channel per call so a slow consumer never blocks publishes.
pub struct LapinMessageBus {
    connection: Connection,
    publish_channel: Channel,
}

impl LapinMessageBus {
    /// Connects to `amqp_url`, opens a channel, and declares the full
    /// queue/exchange topology.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unavailable`] if the connection cannot be
    /// established, or [`BusError::ConsumeFailed`] if topology declaration
    /// fails.
    pub async fn connect(amqp_url: &str) -> Result<Self, BusError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;

        let publish_channel = connection
            .create_channel()
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;

        declare_topology(&publish_channel).await?;

        Ok(Self {
            connection,
            publish_channel,
        })
    }

    /// Returns true if the underlying connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    fn properties_for(options: &PublishOptions) -> BasicProperties {
        let mut properties = BasicProperties::default()
            .with_delivery_mode(if options.persistent { 2 } else { 1 })
            .with_priority(options.priority);

        if let Some(message_id) = &options.message_id {
            properties = properties.with_message_id(message_id.clone().into());
        }
        if let Some(correlation_id) = &options.correlation_id {
            properties = properties.with_correlation_id(correlation_id.clone().into());
        }
        if let Some(ttl) = options.ttl {
            properties = properties.with_expiration(ttl.as_millis().to_string().into());
        }

        if !options.headers.is_empty() {
            let mut headers = FieldTable::default();
            for (key, value) in &options.headers {
                headers.insert(
                    ShortString::from(key.as_str()),
                    AMQPValue::LongString(LongString::from(value.as_str())),
                );
            }
            properties = properties.with_headers(headers);
        }

        properties
    }

    fn headers_from(properties: &BasicProperties) -> std::collections::HashMap<String, String> {
        let mut headers = std::collections::HashMap::new();
        if let Some(table) = properties.headers() {
            for (key, value) in table.inner() {
                if let AMQPValue::LongString(s) = value {
                    headers.insert(key.to_string(), s.to_string());
                }
            }
        }
        headers
    }
}

#[async_trait]
impl MessageBusPort for LapinMessageBus {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.publish_with_options(queue, payload, PublishOptions::standard(Uuid::new_v4().to_string()))
            .await
    }

    async fn publish_with_options(
        &self,
        queue: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), BusError> {
        let properties = Self::properties_for(&options);

        let confirm = self
            .publish_channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;

        confirm
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;

        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| BusError::ConsumeFailed(e.to_string()))?;

        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| BusError::ConsumeFailed(e.to_string()))?;

        let consumer_tag = format!("order-core-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::ConsumeFailed(e.to_string()))?;

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(e) => {
                    error!(error = %e, queue, "delivery stream error");
                    continue;
                }
            };

            let message = BusMessage {
                payload: delivery.data.clone(),
                headers: Self::headers_from(&delivery.properties),
                redelivered: delivery.redelivered,
            };

            let decision = handler.handle(message).await;

            let ack_result = match decision {
                AckDecision::Ack => delivery.ack(BasicAckOptions::default()).await,
                AckDecision::NackRequeue => {
                    delivery
                        .nack(BasicNackOptions {
                            requeue: true,
                            ..BasicNackOptions::default()
                        })
                        .await
                }
                AckDecision::NackDrop => {
                    delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..BasicNackOptions::default()
                        })
                        .await
                }
            };

            if let Err(e) = ack_result {
                warn!(error = %e, queue, "failed to ack/nack delivery");
            } else {
                debug!(queue, decision = ?decision, "delivery disposed");
            }
        }

        Ok(())
    }
}

//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod event_publisher_port;
mod market_data_client;
mod message_bus_port;
mod order_execution_client;
mod position_client;
mod pricing_data_client;
mod risk_data_client;

pub use event_publisher_port::{
    BusEventPublisher, EventEnvelope, EventPublishError, EventPublisherPort, MessageMetadata,
    NoOpEventPublisher, PositionUpdatePayload,
};
pub use market_data_client::{AssetDetails, IMarketDataClient, MarketDataError, TradingHours};
pub use message_bus_port::{
    AckDecision, BusError, BusMessage, MessageBusPort, MessageHandler, PublishOptions,
};
pub use order_execution_client::{ExecutionError, IOrderExecutionClient};
pub use position_client::{IPositionClient, PositionError};
pub use pricing_data_client::{IPricingDataClient, OrderBook, OrderBookLevel, PricingDataError};
pub use risk_data_client::{IRiskDataClient, RiskDataError, TradingLimits, UserRiskProfile};

#[cfg(test)]
pub use market_data_client::MockIMarketDataClient;
#[cfg(test)]
pub use order_execution_client::MockIOrderExecutionClient;
#[cfg(test)]
pub use position_client::MockIPositionClient;
#[cfg(test)]
pub use pricing_data_client::MockIPricingDataClient;
#[cfg(test)]
pub use risk_data_client::MockIRiskDataClient;

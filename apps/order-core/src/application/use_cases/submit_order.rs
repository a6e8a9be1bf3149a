//! Submit-Order Use Case (C6).
//!
//! Constructs a new order, derives its idempotency key, validates it
//! against market/position/risk context, persists it, and hands it to the
//! worker pool via the bus. Every failure past idempotency-store time
//! fails the idempotency record before returning, so a retried request
//! observes a terminal outcome rather than hanging PENDING until TTL.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::idempotency::{IdempotencyCheck, IdempotencyKey, IdempotencyRecord, IdempotencyRepository};
use crate::domain::order::{
    CreateOrderCommand, Order, OrderEvent, OrderRepository, OrderSide, OrderStatus, OrderType,
};
use crate::domain::pricing::{PricingContext, PricingService, SpreadCondition, LiquidityLevel};
use crate::domain::risk::{RiskContext, RiskService};
use crate::domain::shared::{Money, OrderId, Quantity, Symbol, Timestamp};
use crate::domain::validation::{ValidationContext, ValidationLimits, ValidationService};

use crate::application::error::CoreError;
use crate::application::ports::{
    EventPublisherPort, IMarketDataClient, IPositionClient, IPricingDataClient, IRiskDataClient,
    MessageBusPort, PublishOptions,
};

/// Request accepted by [`SubmitOrderUseCase::execute`].
#[derive(Debug, Clone)]
pub struct SubmitOrderRequest {
    /// Owning user.
    pub user_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market/limit/stop variant.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: String,
    /// Limit/stop price; required for non-market orders.
    pub price: Option<String>,
}

/// Result of a successful (or idempotently-resolved) submission.
#[derive(Debug, Clone)]
pub struct SubmitOrderResult {
    /// The order id.
    pub order_id: String,
    /// Whether this call created a new order or returned a prior result.
    pub resolved_from_prior_request: bool,
    /// Warnings surfaced by validation/pricing/risk, empty when resolved
    /// from a prior completed request.
    pub warnings: Vec<String>,
}

/// Orchestrates order submission end-to-end.
pub struct SubmitOrderUseCase<O, I, B, E, M, P, PR, R>
where
    O: OrderRepository,
    I: IdempotencyRepository,
    B: MessageBusPort,
    E: EventPublisherPort,
    M: IMarketDataClient,
    P: IPositionClient,
    PR: IPricingDataClient,
    R: IRiskDataClient,
{
    orders: Arc<O>,
    idempotency: Arc<I>,
    bus: Arc<B>,
    events: Arc<E>,
    market_data: Arc<M>,
    positions: Arc<P>,
    pricing_data: Arc<PR>,
    risk_data: Arc<R>,
    validation_limits: ValidationLimits,
}

impl<O, I, B, E, M, P, PR, R> SubmitOrderUseCase<O, I, B, E, M, P, PR, R>
where
    O: OrderRepository,
    I: IdempotencyRepository,
    B: MessageBusPort,
    E: EventPublisherPort,
    M: IMarketDataClient,
    P: IPositionClient,
    PR: IPricingDataClient,
    R: IRiskDataClient,
{
    /// Builds a use case wired to the given ports.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: Arc<O>,
        idempotency: Arc<I>,
        bus: Arc<B>,
        events: Arc<E>,
        market_data: Arc<M>,
        positions: Arc<P>,
        pricing_data: Arc<PR>,
        risk_data: Arc<R>,
        validation_limits: ValidationLimits,
    ) -> Self {
        Self {
            orders,
            idempotency,
            bus,
            events,
            market_data,
            positions,
            pricing_data,
            risk_data,
            validation_limits,
        }
    }

    /// Runs the full submission pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for malformed quantities/prices,
    /// [`CoreError::IdempotencyConflict`] for a concurrent duplicate
    /// request, [`CoreError::ValidationError`] when validation/risk rejects
    /// the order, or [`CoreError::TransientIO`]/[`CoreError::PermanentIO`]
    /// for downstream failures.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, symbol = %request.symbol))]
    pub async fn execute(
        &self,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResult, CoreError> {
        let symbol = Symbol::new(&request.symbol);
        let quantity = parse_decimal(&request.quantity, "quantity")?;
        let quantity = Quantity::new(quantity);
        let price = request
            .price
            .as_deref()
            .map(|p| parse_decimal(p, "price"))
            .transpose()?
            .map(Money::new);

        // Step 1: construct the aggregate; enforces type/price invariants.
        let mut order = Order::new(CreateOrderCommand {
            user_id: request.user_id.clone(),
            symbol: symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity,
            price,
        })?;

        // Step 2: derive and check the idempotency key.
        let key = IdempotencyKey::derive(
            &request.user_id,
            &symbol,
            request.order_type,
            request.side,
            quantity,
            price,
        );

        match self.idempotency.check(&key).await.map_err(CoreError::from)? {
            IdempotencyCheck::Completed { order_id } => {
                return Ok(SubmitOrderResult {
                    order_id,
                    resolved_from_prior_request: true,
                    warnings: Vec::new(),
                });
            }
            IdempotencyCheck::Failed { result } => {
                return Err(CoreError::ValidationError(result));
            }
            IdempotencyCheck::Pending => {
                return Err(CoreError::IdempotencyConflict(format!(
                    "a request for key {} is already in flight",
                    key.as_str()
                )));
            }
            IdempotencyCheck::NotFound => {}
        }

        // Step 3: store PENDING before doing anything else observable.
        self.idempotency
            .store(IdempotencyRecord::new_pending(&key, &request.user_id))
            .await
            .map_err(CoreError::from)?;

        // Step 4: validate (merges validation + pricing + risk).
        if let Err(err) = self.validate(&order).await {
            let _ = self.idempotency.fail(&key, &err.to_string()).await;
            order.mark_failed(err.to_string()).ok();
            self.publish_best_effort(order.drain_events()).await;
            return Err(err);
        }

        let warnings = match self.run_context_checks(&order).await {
            Ok(warnings) => warnings,
            Err(err) => {
                let _ = self.idempotency.fail(&key, err.message()).await;
                if let Some(event) = err.as_event(order.id().clone()) {
                    self.publish_best_effort(vec![event]).await;
                }
                return Err(err.into_core_error());
            }
        };

        // Step 5: persist PENDING order.
        if let Err(err) = self.orders.save(&order).await {
            let core_err = CoreError::from(err);
            let _ = self.idempotency.fail(&key, &core_err.to_string()).await;
            return Err(core_err);
        }

        // Step 6: publish OrderSubmitted for the worker pool, outbox-style:
        // persistence already committed above, so a publish failure here is
        // recovered by the outbox sweeper rather than failing the request.
        let order_id = order.id().as_str().to_string();
        if let Err(publish_err) = self.publish_for_processing(&order).await {
            warn!(%order_id, error = %publish_err, "deferring publish to outbox sweeper");
        }

        self.publish_best_effort(order.drain_events()).await;

        // Step 7: complete idempotency with the new order id.
        self.idempotency
            .complete(&key, &order_id, "submitted")
            .await
            .map_err(CoreError::from)?;

        info!(%order_id, "order submitted");

        Ok(SubmitOrderResult {
            order_id,
            resolved_from_prior_request: false,
            warnings,
        })
    }

    async fn validate(&self, order: &Order) -> Result<(), CoreError> {
        let tradeable = self
            .market_data
            .validate_symbol(order.symbol())
            .await
            .map_err(|e| CoreError::TransientIO(e.to_string()))?;

        if !tradeable {
            return Err(CoreError::ValidationError(format!(
                "{} is not tradeable",
                order.symbol().as_str()
            )));
        }

        Ok(())
    }

    async fn run_context_checks(&self, order: &Order) -> Result<Vec<String>, ContextCheckError> {
        let market_open = self
            .market_data
            .is_market_open()
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;
        let market_price = self
            .market_data
            .current_price(order.symbol())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;

        let (available_quantity, available_balance) = match order.side() {
            OrderSide::Sell => {
                let qty = self
                    .positions
                    .available_quantity(order.user_id(), order.symbol())
                    .await
                    .map_err(|e| ContextCheckError::Transient(e.to_string()))?;

                if let Err(err) = order.validate_position_for_sell(qty) {
                    return Err(ContextCheckError::Position {
                        requested: order.quantity(),
                        available: qty,
                        message: err.to_string(),
                    });
                }

                (Some(qty), None)
            }
            OrderSide::Buy => {
                let order_value = if order.calculate_order_value().is_zero() {
                    market_price * order.quantity().amount()
                } else {
                    order.calculate_order_value()
                };
                let sufficient = self
                    .positions
                    .has_sufficient_balance(order.user_id(), order_value)
                    .await
                    .map_err(|e| ContextCheckError::Transient(e.to_string()))?;
                (
                    None,
                    Some(if sufficient {
                        order_value
                    } else {
                        Money::ZERO
                    }),
                )
            }
        };

        let validation_ctx = ValidationContext {
            symbol_tradeable: true,
            market_open,
            market_price,
            available_quantity,
            available_balance,
            position_quantity: available_quantity,
            limits: self.validation_limits.clone(),
        };

        let validation = ValidationService::validate(order, &validation_ctx);
        if !validation.valid {
            return Err(ContextCheckError::Validation(validation.errors.join("; ")));
        }

        let (bid, ask) = self
            .pricing_data
            .market_price(order.symbol())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;

        let pricing_ctx = PricingContext {
            bid,
            ask,
            liquidity: LiquidityLevel::Normal,
            spread_condition: SpreadCondition::Normal,
            max_slippage_percent: rust_decimal_macros::dec!(0.02),
        };
        let recommendation = PricingService::recommend(order, &pricing_ctx);

        let profile = self
            .risk_data
            .user_profile(order.user_id())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;
        let limits = self
            .risk_data
            .trading_limits(order.user_id())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;
        let concentration = self
            .risk_data
            .position_exposure(order.user_id(), order.symbol())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;
        let volatility = self
            .risk_data
            .volatility(order.symbol())
            .await
            .map_err(|e| ContextCheckError::Transient(e.to_string()))?;

        let order_value = order.calculate_order_value();
        let utilization = if profile.max_order_value.amount().is_zero() {
            Decimal::ZERO
        } else {
            order_value.amount() / profile.max_order_value.amount()
        };

        let risk_ctx = RiskContext {
            volatility,
            beta: Decimal::ONE,
            high_volatility_flag: volatility > rust_decimal_macros::dec!(0.5),
            concentration_pct: concentration,
            concentration_limit_pct: limits.max_concentration_pct,
            order_value_utilization: utilization,
            tolerance: profile.tolerance,
            order_size_bucket: rust_decimal_macros::dec!(0.5),
            has_critical_factor: limits.has_critical_violation,
        };
        let assessment = RiskService::assess(&risk_ctx);

        self.publish_best_effort(vec![OrderEvent::RiskCheckPerformed {
            event_id: Uuid::new_v4(),
            order_id: order.id().clone(),
            score: assessment.score,
            requires_manual_approval: assessment.requires_manual_approval,
            occurred_at: Timestamp::now(),
        }])
        .await;

        if assessment.requires_manual_approval {
            return Err(ContextCheckError::Validation(format!(
                "risk score {} requires manual approval",
                assessment.score
            )));
        }

        let mut warnings = validation.warnings;
        warnings.push(format!(
            "recommended execution strategy: {}",
            recommendation.strategy
        ));
        Ok(warnings)
    }

    async fn publish_for_processing(&self, order: &Order) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(&SubmittedOrderPayload {
            order_id: order.id().as_str().to_string(),
            user_id: order.user_id().to_string(),
            symbol: order.symbol().as_str().to_string(),
        })
        .map_err(|e| CoreError::Fatal(e.to_string()))?;

        let mut options = PublishOptions::standard(order.id().as_str().to_string());
        options
            .headers
            .insert("event_type".to_string(), "ORDER_SUBMITTED".to_string());
        options
            .headers
            .insert("user_id".to_string(), order.user_id().to_string());
        options
            .headers
            .insert("symbol".to_string(), order.symbol().as_str().to_string());

        self.bus
            .publish_with_options("orders.processing", payload, options)
            .await
            .map_err(|e| CoreError::TransientIO(e.to_string()))
    }

    async fn publish_best_effort(&self, events: Vec<crate::domain::order::OrderEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.events.publish_order_events(events).await {
            warn!(error = %err, "failed to publish order domain events");
        }
    }
}

/// Why [`SubmitOrderUseCase::run_context_checks`] rejected an order,
/// carrying enough detail for the caller to emit the right domain event
/// (§3, §4.6 step 4) alongside failing the idempotency key.
enum ContextCheckError {
    /// A market/position/pricing/risk client call failed.
    Transient(String),
    /// A sell order's requested quantity exceeds the available position.
    Position {
        requested: Quantity,
        available: Quantity,
        message: String,
    },
    /// General validation or risk-manual-approval rejection.
    Validation(String),
}

impl ContextCheckError {
    fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Validation(m) => m,
            Self::Position { message, .. } => message,
        }
    }

    /// Builds the domain event this rejection should emit, if any.
    /// Transient failures aren't rejections, so they emit nothing.
    fn as_event(&self, order_id: OrderId) -> Option<OrderEvent> {
        let occurred_at = Timestamp::now();
        match self {
            Self::Transient(_) => None,
            Self::Position {
                requested,
                available,
                ..
            } => Some(OrderEvent::PositionValidationFailed {
                event_id: Uuid::new_v4(),
                order_id,
                requested: *requested,
                available: *available,
                occurred_at,
            }),
            Self::Validation(message) => Some(OrderEvent::OrderValidationFailed {
                event_id: Uuid::new_v4(),
                order_id,
                errors: message.split("; ").map(str::to_string).collect(),
                occurred_at,
            }),
        }
    }

    fn into_core_error(self) -> CoreError {
        match self {
            Self::Transient(message) => CoreError::TransientIO(message),
            Self::Position { message, .. } | Self::Validation(message) => {
                CoreError::ValidationError(message)
            }
        }
    }
}

#[derive(serde::Serialize)]
struct SubmittedOrderPayload {
    order_id: String,
    user_id: String,
    symbol: String,
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, CoreError> {
    Decimal::from_str(value)
        .map_err(|_| CoreError::InvalidInput(format!("{field} is not a valid decimal: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        BusError, MessageHandler, MockIMarketDataClient, MockIPositionClient,
        MockIPricingDataClient, MockIRiskDataClient,
    };
    use crate::domain::risk::RiskTolerance;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::RwLock as StdRwLock;

    struct InMemoryOrders {
        orders: StdRwLock<HashMap<String, Order>>,
    }

    impl InMemoryOrders {
        fn new() -> Self {
            Self {
                orders: StdRwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl OrderRepository for InMemoryOrders {
        async fn save(&self, order: &Order) -> Result<(), crate::domain::order::OrderError> {
            self.orders
                .write()
                .unwrap()
                .insert(order.id().as_str().to_string(), order.clone());
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &crate::domain::shared::OrderId,
        ) -> Result<Option<Order>, crate::domain::order::OrderError> {
            Ok(self.orders.read().unwrap().get(id.as_str()).cloned())
        }

        async fn find_by_user(
            &self,
            _user_id: &str,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_user_and_status(
            &self,
            _user_id: &str,
            _status: OrderStatus,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_status(
            &self,
            _status: OrderStatus,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &crate::domain::shared::OrderId,
            _status: OrderStatus,
            _failure_reason: Option<String>,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }

        async fn update_execution(
            &self,
            _id: &crate::domain::shared::OrderId,
            _execution_price: Money,
            _executed_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }

        async fn find_history(
            &self,
            _user_id: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_symbol(
            &self,
            _symbol: &Symbol,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn find_by_date_range(
            &self,
            _from: chrono::DateTime<chrono::Utc>,
            _to: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<Order>, crate::domain::order::OrderError> {
            Ok(Vec::new())
        }

        async fn count_by_user(&self, _user_id: &str) -> Result<u64, crate::domain::order::OrderError> {
            Ok(0)
        }

        async fn delete(
            &self,
            _id: &crate::domain::shared::OrderId,
        ) -> Result<(), crate::domain::order::OrderError> {
            Ok(())
        }
    }

    struct InMemoryIdempotency {
        records: StdRwLock<HashMap<String, IdempotencyRecord>>,
    }

    impl InMemoryIdempotency {
        fn new() -> Self {
            Self {
                records: StdRwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl IdempotencyRepository for InMemoryIdempotency {
        async fn check(
            &self,
            key: &IdempotencyKey,
        ) -> Result<IdempotencyCheck, crate::domain::idempotency::IdempotencyError> {
            let records = self.records.read().unwrap();
            let Some(record) = records.get(key.as_str()) else {
                return Ok(IdempotencyCheck::NotFound);
            };
            use crate::domain::idempotency::IdempotencyStatus;
            Ok(match record.status() {
                IdempotencyStatus::Completed => IdempotencyCheck::Completed {
                    order_id: record.order_id().unwrap_or_default().to_string(),
                },
                IdempotencyStatus::Failed => IdempotencyCheck::Failed {
                    result: record.result().unwrap_or_default().to_string(),
                },
                IdempotencyStatus::Pending => IdempotencyCheck::Pending,
                IdempotencyStatus::Expired => IdempotencyCheck::NotFound,
            })
        }

        async fn store(
            &self,
            record: IdempotencyRecord,
        ) -> Result<(), crate::domain::idempotency::IdempotencyError> {
            self.records
                .write()
                .unwrap()
                .insert(record.key().to_string(), record);
            Ok(())
        }

        async fn complete(
            &self,
            key: &IdempotencyKey,
            order_id: &str,
            result: &str,
        ) -> Result<(), crate::domain::idempotency::IdempotencyError> {
            let mut records = self.records.write().unwrap();
            records
                .get_mut(key.as_str())
                .unwrap()
                .complete(order_id.to_string(), result.to_string())
        }

        async fn fail(
            &self,
            key: &IdempotencyKey,
            result: &str,
        ) -> Result<(), crate::domain::idempotency::IdempotencyError> {
            let mut records = self.records.write().unwrap();
            records.get_mut(key.as_str()).unwrap().fail(result.to_string())
        }

        async fn cleanup_expired(&self) -> Result<u64, crate::domain::idempotency::IdempotencyError> {
            Ok(0)
        }
    }

    struct NoopBus;

    #[async_trait::async_trait]
    impl MessageBusPort for NoopBus {
        async fn publish(&self, _queue: &str, _payload: Vec<u8>) -> Result<(), BusError> {
            Ok(())
        }

        async fn publish_with_options(
            &self,
            _queue: &str,
            _payload: Vec<u8>,
            _options: PublishOptions,
        ) -> Result<(), BusError> {
            Ok(())
        }

        async fn consume(
            &self,
            _queue: &str,
            _prefetch: u16,
            _handler: Arc<dyn MessageHandler>,
        ) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn harness() -> SubmitOrderUseCase<
        InMemoryOrders,
        InMemoryIdempotency,
        NoopBus,
        crate::application::ports::NoOpEventPublisher,
        MockIMarketDataClient,
        MockIPositionClient,
        MockIPricingDataClient,
        MockIRiskDataClient,
    > {
        let mut market_data = MockIMarketDataClient::new();
        market_data.expect_validate_symbol().returning(|_| Ok(true));
        market_data.expect_is_market_open().returning(|| Ok(true));
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::usd(100.0)));

        let mut positions = MockIPositionClient::new();
        positions
            .expect_has_sufficient_balance()
            .returning(|_, _| Ok(true));
        positions
            .expect_available_quantity()
            .returning(|_, _| Ok(Quantity::from_i64(1000)));

        let mut pricing_data = MockIPricingDataClient::new();
        pricing_data
            .expect_market_price()
            .returning(|_| Ok((Money::usd(99.5), Money::usd(100.5))));

        let mut risk_data = MockIRiskDataClient::new();
        risk_data.expect_user_profile().returning(|_| {
            Ok(crate::application::ports::UserRiskProfile {
                tolerance: RiskTolerance::Moderate,
                max_order_value: Money::usd(1_000_000.0),
            })
        });
        risk_data.expect_trading_limits().returning(|_| {
            Ok(crate::application::ports::TradingLimits {
                max_concentration_pct: dec!(0.5),
                has_critical_violation: false,
            })
        });
        risk_data
            .expect_position_exposure()
            .returning(|_, _| Ok(dec!(0.05)));
        risk_data.expect_volatility().returning(|_| Ok(dec!(0.2)));

        SubmitOrderUseCase::new(
            Arc::new(InMemoryOrders::new()),
            Arc::new(InMemoryIdempotency::new()),
            Arc::new(NoopBus),
            Arc::new(crate::application::ports::NoOpEventPublisher),
            Arc::new(market_data),
            Arc::new(positions),
            Arc::new(pricing_data),
            Arc::new(risk_data),
            ValidationLimits::default(),
        )
    }

    fn request() -> SubmitOrderRequest {
        SubmitOrderRequest {
            user_id: "user-1".to_string(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: "10".to_string(),
            price: None,
        }
    }

    #[tokio::test]
    async fn submits_new_order_successfully() {
        let use_case = harness();
        let result = use_case.execute(request()).await.unwrap();
        assert!(!result.resolved_from_prior_request);
        assert!(!result.order_id.is_empty());
    }

    #[tokio::test]
    async fn resubmitting_the_same_request_is_idempotent() {
        let use_case = harness();
        let first = use_case.execute(request()).await.unwrap();
        let second = use_case.execute(request()).await.unwrap();

        assert_eq!(first.order_id, second.order_id);
        assert!(second.resolved_from_prior_request);
    }

    #[tokio::test]
    async fn rejects_malformed_quantity() {
        let use_case = harness();
        let mut req = request();
        req.quantity = "not-a-number".to_string();

        let result = use_case.execute(req).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn rejects_untradeable_symbol() {
        let mut market_data = MockIMarketDataClient::new();
        market_data
            .expect_validate_symbol()
            .returning(|_| Ok(false));

        let positions = MockIPositionClient::new();
        let pricing_data = MockIPricingDataClient::new();
        let risk_data = MockIRiskDataClient::new();

        let use_case = SubmitOrderUseCase::new(
            Arc::new(InMemoryOrders::new()),
            Arc::new(InMemoryIdempotency::new()),
            Arc::new(NoopBus),
            Arc::new(crate::application::ports::NoOpEventPublisher),
            Arc::new(market_data),
            Arc::new(positions),
            Arc::new(pricing_data),
            Arc::new(risk_data),
            ValidationLimits::default(),
        );

        let result = use_case.execute(request()).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    struct RecordingEventPublisher {
        events: tokio::sync::Mutex<Vec<OrderEvent>>,
    }

    impl RecordingEventPublisher {
        fn new() -> Self {
            Self {
                events: tokio::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl crate::application::ports::EventPublisherPort for RecordingEventPublisher {
        async fn publish_order_events(
            &self,
            events: Vec<OrderEvent>,
        ) -> Result<(), crate::application::ports::EventPublishError> {
            self.events.lock().await.extend(events);
            Ok(())
        }
    }

    fn sell_request(quantity: &str) -> SubmitOrderRequest {
        SubmitOrderRequest {
            user_id: "user-1".to_string(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            quantity: quantity.to_string(),
            price: None,
        }
    }

    #[tokio::test]
    async fn sell_with_insufficient_position_fails_idempotency_and_emits_position_event() {
        let mut market_data = MockIMarketDataClient::new();
        market_data.expect_validate_symbol().returning(|_| Ok(true));
        market_data.expect_is_market_open().returning(|| Ok(true));
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::usd(100.0)));

        let mut positions = MockIPositionClient::new();
        positions
            .expect_available_quantity()
            .returning(|_, _| Ok(Quantity::from_i64(50)));

        let pricing_data = MockIPricingDataClient::new();
        let risk_data = MockIRiskDataClient::new();

        let idempotency = Arc::new(InMemoryIdempotency::new());
        let events = Arc::new(RecordingEventPublisher::new());

        let use_case = SubmitOrderUseCase::new(
            Arc::new(InMemoryOrders::new()),
            idempotency.clone(),
            Arc::new(NoopBus),
            events.clone(),
            Arc::new(market_data),
            Arc::new(positions),
            Arc::new(pricing_data),
            Arc::new(risk_data),
            ValidationLimits::default(),
        );

        let req = sell_request("100");
        let result = use_case.execute(req.clone()).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));

        // No order row, no bus traffic: only the idempotency key and the
        // domain event reflect the rejection.
        let key = IdempotencyKey::derive(
            &req.user_id,
            &Symbol::new(&req.symbol),
            req.order_type,
            req.side,
            Quantity::new(Decimal::from_str(&req.quantity).unwrap()),
            None,
        );
        let check = idempotency.check(&key).await.unwrap();
        assert!(matches!(check, IdempotencyCheck::Failed { .. }));

        let published = events.events.lock().await;
        assert_eq!(published.len(), 1);
        assert!(matches!(
            published[0],
            OrderEvent::PositionValidationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn resubmitting_after_position_failure_re_evaluates_instead_of_conflicting() {
        let mut market_data = MockIMarketDataClient::new();
        market_data.expect_validate_symbol().returning(|_| Ok(true));
        market_data.expect_is_market_open().returning(|| Ok(true));
        market_data
            .expect_current_price()
            .returning(|_| Ok(Money::usd(100.0)));

        let mut positions = MockIPositionClient::new();
        positions
            .expect_available_quantity()
            .returning(|_, _| Ok(Quantity::from_i64(50)));

        let pricing_data = MockIPricingDataClient::new();
        let risk_data = MockIRiskDataClient::new();

        let use_case = SubmitOrderUseCase::new(
            Arc::new(InMemoryOrders::new()),
            Arc::new(InMemoryIdempotency::new()),
            Arc::new(NoopBus),
            Arc::new(crate::application::ports::NoOpEventPublisher),
            Arc::new(market_data),
            Arc::new(positions),
            Arc::new(pricing_data),
            Arc::new(risk_data),
            ValidationLimits::default(),
        );

        let req = sell_request("100");
        let first = use_case.execute(req.clone()).await;
        assert!(matches!(first, Err(CoreError::ValidationError(_))));

        // With the key left PENDING this would incorrectly surface as
        // IdempotencyConflict instead of re-running validation.
        let second = use_case.execute(req).await;
        assert!(matches!(second, Err(CoreError::ValidationError(_))));
    }
}

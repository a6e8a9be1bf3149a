//! Pricing Domain Service
//!
//! Recommends an optimal execution price, range, fill probability,
//! estimated fill time, execution strategy, and slippage tolerance for an
//! order given current market microstructure.

pub mod context;
pub mod recommendation;
pub mod service;

pub use context::{LiquidityLevel, PricingContext, SpreadCondition};
pub use recommendation::{ExecutionStrategy, PriceRange, PricingRecommendation};
pub use service::PricingService;

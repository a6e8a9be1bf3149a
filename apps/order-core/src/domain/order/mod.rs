//! Order Domain
//!
//! The order aggregate, its value objects, domain events, and the
//! repository port implemented by infrastructure adapters.

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod repository;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, DEFAULT_EXECUTION_TOLERANCE};
pub use errors::OrderError;
pub use events::OrderEvent;
pub use repository::OrderRepository;
pub use value_objects::{OrderSide, OrderStatus, OrderType};

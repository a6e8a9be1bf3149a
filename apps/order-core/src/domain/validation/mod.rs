//! Validation Domain Service
//!
//! Checks business rules (symbol, market hours, price deviation, quantity
//! bounds, position/balance sufficiency, order value) over an order and a
//! context assembled by the submit use case from external clients.

pub mod context;
pub mod result;
pub mod service;

pub use context::{ValidationContext, ValidationLimits};
pub use result::ValidationResult;
pub use service::ValidationService;

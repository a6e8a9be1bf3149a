//! Risk Domain Service
//!
//! Computes a composite 0-100 risk score for an order and decides whether
//! manual approval is required before it may execute.

pub mod context;
pub mod score;
pub mod service;

pub use context::{RiskContext, RiskTolerance};
pub use score::{RiskAssessment, RiskLevel};
pub use service::RiskService;

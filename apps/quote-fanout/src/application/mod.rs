//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (token verification, etc.).
pub mod ports;

/// Background services orchestrating the oscillator, autoscaler, health
/// monitor, and reconnection manager.
pub mod services;

//! Message Bus Adapters
//!
//! `lapin`-backed [`MessageBusPort`] implementation, wired with the
//! retry-tier / dead-letter-exchange queue topology.

mod lapin_bus;
mod topology;

pub use lapin_bus::LapinMessageBus;
pub use topology::{declare_topology, RETRY_TIER_QUEUES};

//! Configuration Module
//!
//! Configuration loading for the quote fan-out service, layered over
//! environment variables (prefix `QUOTE_FANOUT_`) via the `config` crate.

mod settings;

pub use settings::{
    AppConfig, AuthMode, AuthSettings, ConfigError, HealthMonitorSettings, ServerSettings,
};

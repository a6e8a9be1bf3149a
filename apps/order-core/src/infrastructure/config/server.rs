//! HTTP server configuration for the health/metrics surface.

use serde::{Deserialize, Serialize};

/// HTTP server configuration. Order intake itself is consumed off the
/// message bus; this surface only exposes liveness/readiness and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port for `/healthz`, `/readyz`, and `/metrics`.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
        }
    }
}

pub(crate) const fn default_http_port() -> u16 {
    8080
}

pub(crate) fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

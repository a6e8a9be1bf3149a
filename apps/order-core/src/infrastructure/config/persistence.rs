//! Order/idempotency persistence backend configuration.

use serde::{Deserialize, Serialize};

/// Which [`crate::infrastructure::persistence`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    /// Process-local, non-durable store. Default for local development.
    InMemory,
    /// Turso-backed store, durable across restarts.
    Turso,
}

impl Default for PersistenceBackend {
    fn default() -> Self {
        Self::InMemory
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Which backend to construct at startup.
    #[serde(default)]
    pub backend: PersistenceBackend,
    /// Turso database path, or `:memory:`. Ignored for the in-memory
    /// backend.
    #[serde(default = "default_turso_path")]
    pub turso_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            turso_path: default_turso_path(),
        }
    }
}

fn default_turso_path() -> String {
    "order_core.db".to_string()
}

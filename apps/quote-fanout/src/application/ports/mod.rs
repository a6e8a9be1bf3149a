//! Port Interfaces
//!
//! Defines the interfaces (ports) the application layer depends on and
//! infrastructure adapters implement, following the same hexagonal split
//! used throughout the workspace: the domain and application layers speak
//! only to traits defined here, never to a concrete HTTP client or token
//! issuer directly.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::autoscale::{LoadSample, ScalingDecision};
use crate::domain::connection::ConnectionId;
use crate::domain::health::PoolSnapshot;

/// Errors surfaced by a [`VerifyTokenPort`] implementation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header and no `token` query parameter were present.
    #[error("missing bearer token")]
    MissingToken,
    /// The token was present but rejected by the verifier.
    #[error("invalid or expired token")]
    InvalidToken,
    /// The verifier itself could not be reached.
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// Identity recovered from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable user identifier from the token issuer.
    pub user_id: String,
    /// Opaque session identifier, if the issuer provides one.
    pub session: Option<String>,
}

/// Bearer-token verification capability consumed by the WebSocket upgrade
/// handler before it accepts a connection. Implemented outside the
/// domain/application layers; represented here as an `#[async_trait]` so
/// the handler can depend on it through a trait object.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait VerifyTokenPort: Send + Sync {
    /// Verify `token` and resolve it to an identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is rejected, or
    /// [`AuthError::Unavailable`] if the verifier could not be reached.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Read-only view over the connection pool's current load and health,
/// consumed by the health monitor and autoscaler background services.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait PoolObserverPort: Send + Sync {
    /// Snapshot used to classify pool health.
    async fn health_snapshot(&self) -> PoolSnapshot;

    /// Snapshot used to evaluate scaling decisions.
    async fn load_sample(&self) -> LoadSample;
}

/// Capability to resize the connection-handling worker pool. Implemented by
/// whatever owns the actual worker tasks.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ScalingPort: Send + Sync {
    /// Apply a scaling decision. A no-op for [`ScalingDecision::Hold`].
    async fn apply(&self, decision: ScalingDecision);
}

/// Capability to retry a single dropped connection. Implemented by the
/// WebSocket handler that owns the underlying client session.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ReconnectionPort: Send + Sync {
    /// Attempt to reconnect `connection_id`, returning whether it succeeded.
    async fn attempt(&self, connection_id: ConnectionId) -> bool;
}

//! Token Verification Adapters
//!
//! Two [`VerifyTokenPort`] implementations: a simulated one for local
//! development and the reference binary, and an HTTP-backed one that
//! delegates to an external auth service. Swap via configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::{AuthError, VerifiedIdentity, VerifyTokenPort};

/// Verifies tokens against a fixed, deterministic rule rather than a live
/// auth service: any non-empty token is accepted, and the resolved user id
/// is derived from the token itself so the same token always maps to the
/// same identity. Useful for local development and the reference binary;
/// swap for [`HttpTokenVerifier`] in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedTokenVerifier;

impl SimulatedTokenVerifier {
    /// Create a new simulated verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VerifyTokenPort for SimulatedTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(VerifiedIdentity {
            user_id: format!("sim-{token}"),
            session: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponseBody {
    user_id: String,
    #[serde(default)]
    session: Option<String>,
}

/// Verifies tokens by calling an external auth service's introspection
/// endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpTokenVerifier {
    /// Build a verifier that POSTs to `verify_url` with `{"token": "..."}`
    /// and expects a `{"user_id": "...", "session": "..."}` body on success.
    #[must_use]
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl VerifyTokenPort for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .client
            .post(&self.verify_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidToken);
        }

        if !response.status().is_success() {
            return Err(AuthError::Unavailable(format!(
                "auth provider returned {}",
                response.status()
            )));
        }

        let body: VerifyResponseBody = response
            .json()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        Ok(VerifiedIdentity {
            user_id: body.user_id,
            session: body.session,
        })
    }
}

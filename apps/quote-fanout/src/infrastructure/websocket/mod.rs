//! WebSocket Fan-out Handler
//!
//! Serves `/quotes`: verifies the caller's bearer token before upgrading,
//! then spawns one task per connection that owns its own `last_quotes` view,
//! diffs every snapshot the oscillator publishes against it, and writes the
//! resulting JSON-Patch envelope to the socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::application::ports::VerifyTokenPort;
use crate::domain::connection::{ClientInfo, ConnectionId, PooledConnection};
use crate::domain::patch::{diff_snapshot, initial_snapshot_ops, JsonPatchOp, QuotesPatchMessage};
use crate::domain::quote::AssetQuote;
use crate::infrastructure::catalog::Oscillator;
use crate::infrastructure::pool::ConnectionPool;

/// Shared state for the `/quotes` route.
#[derive(Clone)]
pub struct WebSocketState {
    /// Oscillator connections subscribe to for snapshot updates.
    pub oscillator: Arc<Oscillator>,
    /// Pool tracking every live connection's bookkeeping record.
    pub pool: Arc<ConnectionPool>,
    /// Token verifier consulted before every upgrade.
    pub verifier: Arc<dyn VerifyTokenPort>,
}

/// Build the router serving `/quotes`.
#[must_use]
pub fn router(state: WebSocketState) -> Router {
    Router::new().route("/quotes", get(upgrade_handler)).with_state(state)
}

#[derive(Debug, Deserialize)]
struct QueryToken {
    token: Option<String>,
}

fn bearer_token(headers: &HeaderMap, query: &QueryToken) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(raw) = value.to_str() {
            if let Some(token) = raw.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    query.token.clone()
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<WebSocketState>,
    Query(query): Query<QueryToken>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers, &query) else {
        warn!("websocket upgrade rejected: no bearer token presented");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "websocket upgrade rejected: token verification failed");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    if !state.pool.has_room() {
        warn!("websocket upgrade rejected: pool at capacity");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let client_info = ClientInfo {
        ip: None,
        user_agent: headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        user_id: Some(identity.user_id),
        session: identity.session,
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, client_info))
}

async fn handle_connection(socket: WebSocket, state: WebSocketState, client_info: ClientInfo) {
    let conn = state.pool.insert(client_info);
    let connection_id = conn.id();
    info!(%connection_id, "quote connection established");

    let mut rx = state.oscillator.subscribe();
    let (mut sink, mut stream) = socket.split();
    let mut last_quotes: HashMap<String, AssetQuote> = HashMap::new();

    // `subscribe` already queued the current catalog snapshot as this
    // receiver's first item; drain it here so the initial full-catalog push
    // (SPEC §4.11) reaches the client the instant the socket is up, rather
    // than riding along with whatever the select loop does next.
    if let Some(snapshot) = rx.recv().await {
        if !send_patch(&mut sink, &connection_id, initial_snapshot_ops(&snapshot), &conn).await {
            conn.deactivate();
            state.pool.remove(connection_id);
            info!(%connection_id, "quote connection closed");
            return;
        }
        last_quotes = snapshot;
    }

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let Some(snapshot) = snapshot else {
                    debug!(%connection_id, "oscillator channel closed");
                    break;
                };

                let ops = if last_quotes.is_empty() {
                    initial_snapshot_ops(&snapshot)
                } else {
                    diff_snapshot(&last_quotes, &snapshot)
                };
                last_quotes = snapshot;

                if !send_patch(&mut sink, &connection_id, ops, &conn).await {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection_id, "client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        conn.touch(chrono::Utc::now());
                    }
                    Some(Err(err)) => {
                        warn!(%connection_id, error = %err, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    conn.deactivate();
    state.pool.remove(connection_id);
    info!(%connection_id, "quote connection closed");
}

/// Encodes `ops` as a `quotes_patch` envelope and writes it to `sink`.
/// Returns `false` when the connection's circuit breaker has tripped and the
/// caller should stop serving this connection.
async fn send_patch(
    sink: &mut SplitSink<WebSocket, Message>,
    connection_id: &ConnectionId,
    ops: Vec<JsonPatchOp>,
    conn: &PooledConnection,
) -> bool {
    let Some(patch) = QuotesPatchMessage::new(ops) else {
        conn.touch(chrono::Utc::now());
        return true;
    };

    let encoded = match serde_json::to_string(&patch) {
        Ok(text) => text,
        Err(err) => {
            warn!(%connection_id, error = %err, "failed to encode quotes patch");
            return true;
        }
    };

    if sink.send(Message::Text(encoded.into())).await.is_ok() {
        conn.record_success();
        conn.touch(chrono::Utc::now());
        true
    } else {
        conn.record_failure();
        if conn.circuit_breaker().is_call_permitted() {
            true
        } else {
            warn!(%connection_id, "circuit open, closing connection");
            false
        }
    }
}

//! Integration tests for the `/quotes` WebSocket endpoint: authentication
//! gating and the initial snapshot + delta tick flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quote_fanout::{
    ConnectionPool, Oscillator, OscillatorConfig, PoolConfig, QuoteCatalog, SimulatedTokenVerifier,
};
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let catalog = Arc::new(QuoteCatalog::new([("AAPL".to_string(), dec!(100.00))]));
    let oscillator = Arc::new(Oscillator::new(
        catalog.clone(),
        OscillatorConfig {
            tick_interval: Duration::from_millis(20),
            subset_size: 1,
            perturbation_pct: dec!(0.01),
        },
    ));
    let pool = Arc::new(ConnectionPool::new(PoolConfig::default()));
    let verifier: Arc<dyn quote_fanout::VerifyTokenPort> = Arc::new(SimulatedTokenVerifier::new());

    let state = quote_fanout::WebSocketState {
        oscillator: oscillator.clone(),
        pool,
        verifier,
    };
    let app = quote_fanout::quotes_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        oscillator.run(tokio_util::sync::CancellationToken::new()).await;
    });

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{addr}/quotes"), handle)
}

#[tokio::test]
async fn unauthenticated_connection_is_rejected_without_upgrade() {
    let (url, _handle) = spawn_server().await;
    let request = url.into_client_request().unwrap();

    let err = tokio_tungstenite::connect_async(request).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected an HTTP error response, got {other:?}"),
    }
}

#[tokio::test]
async fn authenticated_connection_receives_initial_snapshot_then_a_delta() {
    let (url, _handle) = spawn_server().await;
    let mut request = url.into_client_request().unwrap();
    request
        .headers_mut()
        .insert(AUTHORIZATION, "Bearer test-token".parse().unwrap());

    let (mut stream, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(response.status(), 101);

    let first = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("initial snapshot should arrive promptly")
        .expect("stream should not close")
        .expect("message should decode");
    let first_text = first.into_text().unwrap();
    assert!(first_text.contains("\"type\":\"quotes_patch\""));
    assert!(first_text.contains("\"op\":\"add\""));
    assert!(first_text.contains("AAPL"));

    let second = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("a delta tick should arrive within the tick interval")
        .expect("stream should not close")
        .expect("message should decode");
    let second_text = second.into_text().unwrap();
    assert!(second_text.contains("\"type\":\"quotes_patch\""));

    stream.close(None).await.ok();
}

pub mod negotiation_tests;
pub mod session_tests;

use std::net::SocketAddr;

use duet_server::{CapacityPolicy, ServerConfig, SignalingServer};
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Serves a real signaling server on an ephemeral local port and returns its
/// websocket url.
pub async fn start_test_server() -> String {
    start_test_server_with(CapacityPolicy::default()).await
}

pub async fn start_test_server_with(capacity_policy: CapacityPolicy) -> String {
    let config = ServerConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        capacity_policy,
        ..ServerConfig::default()
    };
    let server = SignalingServer::bind(config)
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr().expect("No local address");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    format!("ws://{}/ws", addr)
}

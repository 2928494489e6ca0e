pub mod messaging_tests;
pub mod relay_tests;

use std::net::SocketAddr;
use std::sync::Arc;

use duet_server::{
    CapacityPolicy, QueueMatchmaker, Relay, RelayCommand, ServerConfig, SignalingServer,
};
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::{MockSignalingOutput, RecordedSignal};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_relay(
    policy: CapacityPolicy,
) -> (
    mpsc::Sender<RelayCommand>,
    mpsc::UnboundedReceiver<RecordedSignal>,
    MockSignalingOutput,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<RelayCommand>(100);
    let (signaling, signal_rx) = MockSignalingOutput::new();

    let relay = Relay::new(
        policy,
        Box::new(QueueMatchmaker::new()),
        cmd_rx,
        Arc::new(signaling.clone()),
    );

    tokio::spawn(async move {
        relay.run().await;
    });

    (cmd_tx, signal_rx, signaling)
}

/// Serves the real router on an ephemeral local port.
pub async fn start_test_server() -> (SocketAddr, mpsc::Sender<RelayCommand>) {
    let config = ServerConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..ServerConfig::default()
    };
    let server = SignalingServer::bind(config)
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr().expect("No local address");
    let relay_tx = server.relay();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, relay_tx)
}

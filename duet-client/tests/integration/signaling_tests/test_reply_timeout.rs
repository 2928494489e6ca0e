use std::time::{Duration, Instant};

use duet_client::{ClientError, SignalingClient};
use duet_core::ServerMessage;

use crate::integration::{init_tracing, start_test_server};

#[tokio::test]
async fn test_reply_timeout() {
    init_tracing();
    let url = start_test_server().await;

    let timeout = Duration::from_millis(100);
    let mut client = SignalingClient::connect(&url)
        .await
        .unwrap()
        .with_reply_timeout(timeout);

    let started = Instant::now();
    let result = client
        .wait_for("Matched", |msg| match msg {
            ServerMessage::Matched { room, .. } => Some(room),
            _ => None,
        })
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Timeout {
            expected: "Matched",
            timeout: t,
        }) if t == timeout
    ));
    assert!(started.elapsed() < Duration::from_secs(5));

    client.close().await;
}

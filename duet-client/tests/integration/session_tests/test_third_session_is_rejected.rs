use std::sync::Arc;

use duet_client::{ClientError, PeerSession, SessionConfig, SignalingClient};
use duet_core::ErrorCode;

use crate::integration::{init_tracing, start_test_server};
use crate::utils::{MediaCall, MockMedia};

#[tokio::test]
async fn test_third_session_is_rejected() {
    init_tracing();
    let url = start_test_server().await;

    let mut sessions = Vec::new();
    for label in ["a", "b"] {
        let client = SignalingClient::connect(&url).await.unwrap();
        let (media, events) = MockMedia::new(label);
        let session = PeerSession::open(client, Arc::new(media), events, SessionConfig::new("r1"))
            .await
            .unwrap();
        sessions.push(session);
    }

    let client = SignalingClient::connect(&url).await.unwrap();
    let (media, events) = MockMedia::new("c");
    let result = PeerSession::open(
        client,
        Arc::new(media.clone()),
        events,
        SessionConfig::new("r1"),
    )
    .await;

    assert!(matches!(
        result,
        Err(ClientError::Rejected {
            code: ErrorCode::RoomFull,
            ..
        })
    ));
    assert_eq!(media.calls(), vec![MediaCall::Close]);

    for mut session in sessions {
        session.close().await;
    }
}

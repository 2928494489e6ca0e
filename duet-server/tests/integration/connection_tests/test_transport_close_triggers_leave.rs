use std::time::Duration;

use duet_core::{ClientMessage, RoomId};

use crate::integration::{init_tracing, start_test_server};
use crate::utils::{WsTestClient, members};

#[tokio::test]
async fn test_transport_close_triggers_leave() {
    init_tracing();

    let (addr, relay_tx) = start_test_server().await;
    let mut a = WsTestClient::connect(addr).await.expect("connect a");
    let mut b = WsTestClient::connect(addr).await.expect("connect b");

    for client in [&mut a, &mut b] {
        client
            .send(ClientMessage::Join {
                room: RoomId::from("r1"),
            })
            .await
            .unwrap();
        client.recv().await.unwrap();
    }
    assert_eq!(members(&relay_tx, "r1").await, vec![a.peer_id, b.peer_id]);

    let a_id = a.peer_id;
    drop(a);

    let mut remaining = Vec::new();
    for _ in 0..50 {
        remaining = members(&relay_tx, "r1").await;
        if !remaining.contains(&a_id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, vec![b.peer_id]);

    b.close().await.unwrap();
}

use duet_core::{ErrorCode, PeerId, ServerMessage};
use duet_server::CapacityPolicy;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{join, members};

#[tokio::test]
async fn test_third_peer_gets_room_full() {
    init_tracing();

    let (relay_tx, _signal_rx, signaling) = create_test_relay(CapacityPolicy::Reject);
    let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());

    join(&relay_tx, a, "r1").await;
    assert_eq!(members(&relay_tx, "r1").await, vec![a]);

    join(&relay_tx, b, "r1").await;
    assert_eq!(members(&relay_tx, "r1").await, vec![a, b]);

    join(&relay_tx, c, "r1").await;
    assert_eq!(members(&relay_tx, "r1").await, vec![a, b]);

    let to_a = signaling.signals_for(&a).await;
    assert!(matches!(&to_a[..], [ServerMessage::Joined { peers, .. }] if peers.is_empty()));

    let to_b = signaling.signals_for(&b).await;
    assert!(matches!(&to_b[..], [ServerMessage::Joined { peers, .. }] if peers == &vec![a]));

    let to_c = signaling.signals_for(&c).await;
    assert!(matches!(
        &to_c[..],
        [ServerMessage::Error {
            code: ErrorCode::RoomFull,
            ..
        }]
    ));
}

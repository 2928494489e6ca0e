use duet_core::{PeerId, RoomId, ServerMessage};
use duet_server::CapacityPolicy;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{join, members};

#[tokio::test]
async fn test_evict_oldest() {
    init_tracing();

    let (relay_tx, _signal_rx, signaling) = create_test_relay(CapacityPolicy::EvictOldest);
    let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());

    join(&relay_tx, a, "r1").await;
    join(&relay_tx, b, "r1").await;
    join(&relay_tx, c, "r1").await;

    assert_eq!(members(&relay_tx, "r1").await, vec![b, c]);

    let to_a = signaling.signals_for(&a).await;
    assert_eq!(
        to_a.last(),
        Some(&ServerMessage::Evicted {
            room: RoomId::from("r1")
        })
    );

    // The member that stays learns its partner was replaced.
    let to_b = signaling.signals_for(&b).await;
    assert_eq!(
        to_b.last(),
        Some(&ServerMessage::PeerLeft {
            room: RoomId::from("r1"),
            peer: a,
        })
    );

    let to_c = signaling.signals_for(&c).await;
    assert!(matches!(&to_c[..], [ServerMessage::Joined { peers, .. }] if peers == &vec![b]));
}

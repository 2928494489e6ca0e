use duet_core::{IceCandidate, PeerId, RelayedPayload, RoomId, ServerMessage};
use duet_server::{CapacityPolicy, RelayCommand};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{join, members};

#[tokio::test]
async fn test_candidates_keep_sender_order() {
    init_tracing();

    let (relay_tx, _signal_rx, signaling) = create_test_relay(CapacityPolicy::Reject);
    let (a, b) = (PeerId::new(), PeerId::new());

    join(&relay_tx, a, "r1").await;
    join(&relay_tx, b, "r1").await;

    let sent: Vec<String> = (0..50).map(|i| format!("candidate:{}", i)).collect();
    for candidate in &sent {
        relay_tx
            .send(RelayCommand::Forward {
                peer_id: a,
                room: RoomId::from("r1"),
                payload: RelayedPayload::Candidate {
                    candidate: IceCandidate::new(candidate.clone()),
                },
            })
            .await
            .unwrap();
    }
    members(&relay_tx, "r1").await;

    let received: Vec<String> = signaling
        .relayed_to(&b)
        .await
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::Candidate {
                from, candidate, ..
            } if from == a => Some(candidate.candidate),
            _ => None,
        })
        .collect();

    assert_eq!(received, sent);
}

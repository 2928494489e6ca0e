use duet_core::{PeerId, RoomId};
use duet_server::RelayCommand;
use tokio::sync::{mpsc, oneshot};

/// Timeout for signal exchange operations (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Asks the relay for a room's members.
///
/// The relay handles commands in order, so the reply also proves every
/// command sent before it has been processed.
pub async fn members(relay_tx: &mpsc::Sender<RelayCommand>, room: &str) -> Vec<PeerId> {
    let (reply, rx) = oneshot::channel();
    relay_tx
        .send(RelayCommand::Members {
            room: RoomId::from(room),
            reply,
        })
        .await
        .expect("Relay is gone");
    rx.await.expect("Relay dropped the reply")
}

pub async fn join(relay_tx: &mpsc::Sender<RelayCommand>, peer_id: PeerId, room: &str) {
    relay_tx
        .send(RelayCommand::Join {
            peer_id,
            room: RoomId::from(room),
        })
        .await
        .expect("Relay is gone");
}

pub async fn leave(relay_tx: &mpsc::Sender<RelayCommand>, peer_id: PeerId, room: &str) {
    relay_tx
        .send(RelayCommand::Leave {
            peer_id,
            room: RoomId::from(room),
        })
        .await
        .expect("Relay is gone");
}

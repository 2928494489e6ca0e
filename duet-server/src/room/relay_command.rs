use duet_core::{PeerId, RelayedPayload, RoomId};
use tokio::sync::oneshot;

/// Commands the relay task receives from the WebSocket handlers.
#[derive(Debug)]
pub enum RelayCommand {
    /// Join (or create) a room.
    Join { peer_id: PeerId, room: RoomId },

    /// Leave a room. A no-op when the peer is not in it.
    Leave { peer_id: PeerId, room: RoomId },

    /// Offer, Answer or Candidate to forward to the rest of the room.
    Forward {
        peer_id: PeerId,
        room: RoomId,
        payload: RelayedPayload,
    },

    /// Ask the matchmaker for a partner.
    FindMatch { peer_id: PeerId, interests: String },

    /// The peer's transport closed.
    Disconnect { peer_id: PeerId },

    /// Current members of a room, oldest first.
    Members {
        room: RoomId,
        reply: oneshot::Sender<Vec<PeerId>>,
    },
}

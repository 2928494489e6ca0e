use async_trait::async_trait;
use duet_core::{ErrorCode, PeerId, ServerMessage};

/// Outbound side of the signaling transport, as seen by the relay.
///
/// Implemented by [`crate::SignalingService`] over WebSockets and by test
/// doubles that record what would have been sent.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver a message to one connected peer. Unknown peers are ignored.
    async fn send_signal(&self, peer_id: PeerId, msg: ServerMessage);

    async fn send_error(&self, peer_id: PeerId, code: ErrorCode, message: String) {
        self.send_signal(peer_id, ServerMessage::Error { code, message })
            .await;
    }
}

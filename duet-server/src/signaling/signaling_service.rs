use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use duet_core::codec::encode_server;
use duet_core::{IceServerConfig, PeerId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct SignalingInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Connection table: one outbound queue per live WebSocket.
///
/// Each queue is drained in order by that socket's writer task, which gives
/// per-recipient FIFO delivery.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    /// Registers the outbound queue of a new socket. Returns `false` and
    /// leaves the table untouched when `peer_id` already has a live socket.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) -> bool {
        match self.inner.peers.entry(peer_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    /// Whether `peer_id` is currently served by the socket owning `tx`.
    pub fn owns(&self, peer_id: &PeerId, tx: &mpsc::UnboundedSender<Message>) -> bool {
        self.inner
            .peers
            .get(peer_id)
            .is_some_and(|current| current.same_channel(tx))
    }

    /// Drops the entry for `peer_id`, but only if it still belongs to the
    /// socket owning `tx`.
    pub fn remove_peer(&self, peer_id: &PeerId, tx: &mpsc::UnboundedSender<Message>) -> bool {
        self.inner
            .peers
            .remove_if(peer_id, |_, current| current.same_channel(tx))
            .is_some()
    }

    pub fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    pub fn connected_peers(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn push(&self, peer_id: PeerId, msg: ServerMessage) {
        let Some(peer) = self.inner.peers.get(&peer_id) else {
            warn!("Attempted to send {} to disconnected peer {}", msg.kind(), peer_id);
            return;
        };

        match encode_server(&msg) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to queue WS message for {}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_signal(&self, peer_id: PeerId, msg: ServerMessage) {
        self.push(peer_id, msg);
    }
}

use crate::config::{CapacityPolicy, ServerConfig};
use crate::matchmaking::{Matchmaker, QueueMatchmaker};
use crate::room::relay_command::RelayCommand;
use crate::room::room_registry::{RegistryError, RoomRegistry};
use crate::signaling::SignalingOutput;
use duet_core::{ErrorCode, PeerId, RelayedPayload, RoomId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Rendezvous relay: owns the room table and forwards negotiation traffic.
///
/// Every command is handled to completion before the next one is read, so
/// registry mutations are serialized without locks.
pub struct Relay {
    registry: RoomRegistry,
    matchmaker: Box<dyn Matchmaker>,
    command_rx: mpsc::Receiver<RelayCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl Relay {
    pub fn new(
        policy: CapacityPolicy,
        matchmaker: Box<dyn Matchmaker>,
        command_rx: mpsc::Receiver<RelayCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(policy),
            matchmaker,
            command_rx,
            signaling,
        }
    }

    /// Starts a relay task with the default matchmaker and returns its
    /// command queue.
    pub fn spawn(
        config: &ServerConfig,
        signaling: Arc<dyn SignalingOutput>,
    ) -> mpsc::Sender<RelayCommand> {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let relay = Relay::new(
            config.capacity_policy,
            Box::new(QueueMatchmaker::new()),
            rx,
            signaling,
        );
        tokio::spawn(relay.run());
        tx
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Relay event loop finished");
    }

    async fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Join { peer_id, room } => self.join(peer_id, room).await,

            RelayCommand::Leave { peer_id, room } => {
                if self.registry.leave(&peer_id, &room) {
                    info!("Peer {} left room '{}'", peer_id, room);
                    let remaining = self.registry.members(&room);
                    self.announce_departure(&remaining, &room, peer_id).await;
                } else {
                    debug!("Peer {} is not in room '{}', leave ignored", peer_id, room);
                }
            }

            RelayCommand::Forward {
                peer_id,
                room,
                payload,
            } => self.forward(peer_id, room, payload).await,

            RelayCommand::FindMatch { peer_id, interests } => {
                let Some(pair) = self.matchmaker.enqueue(peer_id, &interests) else {
                    return;
                };
                info!(
                    "Matched {} with {} in room '{}'",
                    pair.first, pair.second, pair.room
                );
                self.signaling
                    .send_signal(
                        pair.first,
                        ServerMessage::Matched {
                            room: pair.room.clone(),
                            peer: pair.second,
                        },
                    )
                    .await;
                self.signaling
                    .send_signal(
                        pair.second,
                        ServerMessage::Matched {
                            room: pair.room,
                            peer: pair.first,
                        },
                    )
                    .await;
            }

            RelayCommand::Disconnect { peer_id } => {
                self.matchmaker.withdraw(&peer_id);
                if let Some(room) = self.registry.disconnect(&peer_id) {
                    info!("Peer {} dropped out of room '{}'", peer_id, room);
                    let remaining = self.registry.members(&room);
                    self.announce_departure(&remaining, &room, peer_id).await;
                }
            }

            RelayCommand::Members { room, reply } => {
                let _ = reply.send(self.registry.members(&room));
            }
        }
    }

    async fn join(&mut self, peer_id: PeerId, room: RoomId) {
        match self.registry.join(peer_id, room) {
            Ok(joined) => {
                info!(
                    "Peer {} joined room '{}' ({} already there)",
                    peer_id,
                    joined.room,
                    joined.peers.len()
                );

                if let Some(old_room) = &joined.moved_from {
                    let remaining = self.registry.members(old_room);
                    self.announce_departure(&remaining, old_room, peer_id).await;
                }

                if let Some(evicted) = joined.evicted {
                    self.signaling
                        .send_signal(
                            evicted,
                            ServerMessage::Evicted {
                                room: joined.room.clone(),
                            },
                        )
                        .await;
                    self.announce_departure(&joined.peers, &joined.room, evicted)
                        .await;
                }

                self.signaling
                    .send_signal(
                        peer_id,
                        ServerMessage::Joined {
                            room: joined.room,
                            peers: joined.peers,
                        },
                    )
                    .await;
            }
            Err(e @ RegistryError::RoomFull { .. }) => {
                warn!("Join refused for {}: {}", peer_id, e);
                self.signaling
                    .send_error(peer_id, ErrorCode::RoomFull, e.to_string())
                    .await;
            }
        }
    }

    /// Tells the members still in `room` that `peer` is gone.
    async fn announce_departure(&self, remaining: &[PeerId], room: &RoomId, peer: PeerId) {
        for member in remaining {
            self.signaling
                .send_signal(
                    *member,
                    ServerMessage::PeerLeft {
                        room: room.clone(),
                        peer,
                    },
                )
                .await;
        }
    }

    async fn forward(&mut self, peer_id: PeerId, room: RoomId, payload: RelayedPayload) {
        let Some(recipients) = self.registry.recipients(&peer_id, &room) else {
            warn!(
                "Peer {} sent {} for room '{}' without being a member, dropped",
                peer_id,
                payload.kind(),
                room
            );
            return;
        };

        if recipients.is_empty() {
            debug!(
                "No one else in room '{}' yet, {} from {} dropped",
                room,
                payload.kind(),
                peer_id
            );
            return;
        }

        for recipient in recipients {
            debug!("Relaying {} {} -> {}", payload.kind(), peer_id, recipient);
            self.signaling
                .send_signal(recipient, payload.clone().deliver(room.clone(), peer_id))
                .await;
        }
    }
}

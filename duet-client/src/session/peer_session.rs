use crate::error::ClientError;
use crate::media::{MediaEvent, MediaSession};
use crate::negotiation::{NegotiationCloser, NegotiationError, NegotiationPhase, Negotiator, Role};
use crate::session::{RolePolicy, SessionConfig};
use crate::signaling::SignalingClient;
use duet_core::{ClientMessage, PeerId, RoomId, ServerMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the owner of a [`PeerSession`] gets told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Coalesced: a phase the session passes through between two events it
    /// handles is not reported.
    PhaseChanged(NegotiationPhase),
    RemoteStream { stream_id: String, track_id: String },
    /// The remote peer is gone: its media connection dropped or the server
    /// reported it left the room.
    PeerGone,
    /// Another peer took our seat in the room.
    Evicted,
}

enum SessionCommand {
    Start(oneshot::Sender<Result<(), NegotiationError>>),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// One peer's side of a one-to-one call in a room.
///
/// All negotiation runs on a single task that handles server messages, media
/// events and owner commands one at a time, in arrival order.
pub struct PeerSession {
    peer_id: PeerId,
    room: RoomId,
    role: Role,
    phase_rx: watch::Receiver<NegotiationPhase>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    closer: NegotiationCloser,
    task: Option<JoinHandle<()>>,
}

impl PeerSession {
    /// Joins the configured room and spawns the session task.
    ///
    /// Under [`RolePolicy::Auto`] the second peer to arrive starts
    /// negotiating right away.
    pub async fn open(
        mut client: SignalingClient,
        media: Arc<dyn MediaSession>,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
        config: SessionConfig,
    ) -> Result<Self, ClientError> {
        let peers = match client.join(config.room.clone()).await {
            Ok(peers) => peers,
            Err(e) => {
                warn!("Could not join room '{}': {}", config.room, e);
                if let Err(e) = media.close().await {
                    warn!("Media close failed: {:#}", e);
                }
                client.close().await;
                return Err(e);
            }
        };

        let remote = peers.first().copied();
        let role = match config.role {
            RolePolicy::Fixed(role) => role,
            RolePolicy::Auto if remote.is_some() => Role::Initiator,
            RolePolicy::Auto => Role::Responder,
        };
        let auto_start = config.role == RolePolicy::Auto && role == Role::Initiator;

        let peer_id = client.peer_id();
        info!(
            "Peer {} in room '{}' as {} ({} already there)",
            peer_id,
            config.room,
            role,
            peers.len()
        );

        let mut negotiator = Negotiator::new(
            config.room.clone(),
            peer_id,
            role,
            media,
            client.sender(),
        );
        if let Some(remote) = remote {
            negotiator.bind_remote(remote);
        }

        let phase_rx = negotiator.subscribe();
        let closer = negotiator.closer();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            room: config.room.clone(),
            client,
            negotiator,
            media_events,
            commands: command_rx,
            events: event_tx,
            last_phase: NegotiationPhase::Idle,
        };
        let task = tokio::spawn(task.run(auto_start));

        Ok(Self {
            peer_id,
            room: config.room,
            role,
            phase_rx,
            commands: command_tx,
            events: event_rx,
            closer,
            task: Some(task),
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> NegotiationPhase {
        *self.phase_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationPhase> {
        self.phase_rx.clone()
    }

    /// Resolves once the negotiation reaches `phase`. Fails with
    /// [`ClientError::Closed`] if it closes first.
    pub async fn wait_for(&self, phase: NegotiationPhase) -> Result<(), ClientError> {
        let mut rx = self.phase_rx.clone();
        let reached = rx
            .wait_for(|p| *p == phase || p.is_terminal())
            .await
            .map_err(|_| ClientError::Closed)?;

        if *reached == phase {
            Ok(())
        } else {
            Err(ClientError::Closed)
        }
    }

    /// Sends the offer. Only valid for an initiator that has not started.
    pub async fn start(&self) -> Result<(), ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Start(reply_tx))
            .map_err(|_| ClientError::Closed)?;
        reply_rx.await.map_err(|_| ClientError::Closed)??;
        Ok(())
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Leaves the room and tears everything down. A media call that is in
    /// flight is abandoned.
    pub async fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.closer.close().await;
        let _ = self.commands.send(SessionCommand::Close);
        if let Err(e) = task.await {
            warn!("Session task for room '{}' panicked: {}", self.room, e);
        }
    }
}

struct SessionTask {
    room: RoomId,
    client: SignalingClient,
    negotiator: Negotiator,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    last_phase: NegotiationPhase,
}

impl SessionTask {
    async fn run(mut self, auto_start: bool) {
        if auto_start {
            let result = self.negotiator.start_negotiation().await;
            if self.outcome("start", result) == Flow::Stop {
                self.shutdown().await;
                return;
            }
            self.report_phase();
        }

        let mut media_open = true;
        loop {
            let flow = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Start(reply)) => {
                        let result = self.negotiator.start_negotiation().await;
                        let _ = reply.send(result);
                        Flow::Continue
                    }
                    Some(SessionCommand::Close) | None => Flow::Stop,
                },

                msg = self.client.recv() => match msg {
                    Some(msg) => self.on_server_message(msg).await,
                    None => {
                        info!("Signaling connection lost, ending session in '{}'", self.room);
                        Flow::Stop
                    }
                },

                event = self.media_events.recv(), if media_open => match event {
                    Some(event) => self.on_media_event(event),
                    None => {
                        media_open = false;
                        Flow::Continue
                    }
                },
            };

            self.report_phase();
            if flow == Flow::Stop || self.negotiator.phase().is_terminal() {
                break;
            }
        }

        self.shutdown().await;
    }

    async fn on_server_message(&mut self, msg: ServerMessage) -> Flow {
        match msg {
            ServerMessage::Offer { room, from, sdp } if room == self.room => {
                let result = self.negotiator.on_offer_received(from, sdp).await;
                self.outcome("Offer", result)
            }
            ServerMessage::Answer { room, from, sdp } if room == self.room => {
                let result = self.negotiator.on_answer_received(from, sdp).await;
                self.outcome("Answer", result)
            }
            ServerMessage::Candidate {
                room,
                from,
                candidate,
            } if room == self.room => {
                let result = self.negotiator.on_candidate_received(from, candidate).await;
                self.outcome("Candidate", result)
            }
            ServerMessage::Evicted { room } if room == self.room => {
                warn!("Evicted from room '{}'", room);
                let _ = self.events.send(SessionEvent::Evicted);
                Flow::Stop
            }
            ServerMessage::PeerLeft { room, peer }
                if room == self.room && self.negotiator.remote_peer() == Some(peer) =>
            {
                info!("Peer {} left room '{}', ending session", peer, room);
                let _ = self.events.send(SessionEvent::PeerGone);
                Flow::Stop
            }
            ServerMessage::Error { code, message } => {
                warn!("Server reported {:?}: {}", code, message);
                Flow::Continue
            }
            other => {
                debug!("Ignoring {} in session for '{}'", other.kind(), self.room);
                Flow::Continue
            }
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) -> Flow {
        match event {
            MediaEvent::LocalCandidate(candidate) => {
                let msg = ClientMessage::Candidate {
                    room: self.room.clone(),
                    candidate,
                };
                match self.client.send(msg) {
                    Ok(()) => Flow::Continue,
                    Err(_) => Flow::Stop,
                }
            }
            MediaEvent::RemoteStream {
                stream_id,
                track_id,
            } => {
                info!("Remote stream {} (track {})", stream_id, track_id);
                let _ = self.events.send(SessionEvent::RemoteStream {
                    stream_id,
                    track_id,
                });
                Flow::Continue
            }
            MediaEvent::ConnectionLost => {
                info!("Media connection in '{}' lost", self.room);
                let _ = self.events.send(SessionEvent::PeerGone);
                Flow::Stop
            }
        }
    }

    fn outcome(&self, what: &str, result: Result<(), NegotiationError>) -> Flow {
        match result {
            Ok(()) => Flow::Continue,
            Err(e) if e.is_benign() => {
                info!("{} ignored: {}", what, e);
                Flow::Continue
            }
            Err(NegotiationError::Closed) => Flow::Stop,
            Err(e) => {
                warn!("{} in room '{}' ended negotiation: {}", what, self.room, e);
                Flow::Stop
            }
        }
    }

    fn report_phase(&mut self) {
        let phase = self.negotiator.phase();
        if phase != self.last_phase {
            self.last_phase = phase;
            let _ = self.events.send(SessionEvent::PhaseChanged(phase));
        }
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.client.leave(self.room.clone()) {
            debug!("Leave for '{}' not sent: {}", self.room, e);
        }
        self.negotiator.close().await;
        self.report_phase();
        self.client.close().await;
        info!("Session in room '{}' closed", self.room);
    }
}

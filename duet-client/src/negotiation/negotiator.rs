use crate::media::MediaSession;
use crate::negotiation::{CandidateBuffer, NegotiationError, NegotiationPhase, Role};
use duet_core::{ClientMessage, IceCandidate, PeerId, RoomId, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Closes a negotiation from outside the task that drives it.
///
/// A media call already in flight finishes, but its result is discarded and
/// nothing more is sent.
#[derive(Clone)]
pub struct NegotiationCloser {
    closed: Arc<AtomicBool>,
    media: Arc<dyn MediaSession>,
}

impl NegotiationCloser {
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.media.close().await {
            warn!("Media close failed: {:#}", e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Offer/answer state machine for one peer relationship.
///
/// Methods take `&mut self`: whoever owns the negotiator feeds it one event
/// at a time, in arrival order.
pub struct Negotiator {
    room: RoomId,
    local_peer: PeerId,
    remote_peer: Option<PeerId>,
    role: Role,
    completed_as: Option<Role>,
    phase: NegotiationPhase,
    phase_tx: watch::Sender<NegotiationPhase>,
    has_remote_description: bool,
    buffer: CandidateBuffer,
    media: Arc<dyn MediaSession>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    closed: Arc<AtomicBool>,
}

impl Negotiator {
    pub fn new(
        room: RoomId,
        local_peer: PeerId,
        role: Role,
        media: Arc<dyn MediaSession>,
        outbound: mpsc::UnboundedSender<ClientMessage>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(NegotiationPhase::Idle);
        Self {
            room,
            local_peer,
            remote_peer: None,
            role,
            completed_as: None,
            phase: NegotiationPhase::Idle,
            phase_tx,
            has_remote_description: false,
            buffer: CandidateBuffer::new(),
            media,
            outbound,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pins the remote side when it is already known, e.g. from the join
    /// acknowledgement. Otherwise the first signal's sender is used.
    pub fn bind_remote(&mut self, peer_id: PeerId) {
        self.remote_peer = Some(peer_id);
    }

    pub fn phase(&self) -> NegotiationPhase {
        if self.closed.load(Ordering::SeqCst) {
            return NegotiationPhase::Closed;
        }
        self.phase
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationPhase> {
        self.phase_tx.subscribe()
    }

    pub fn closer(&self) -> NegotiationCloser {
        NegotiationCloser {
            closed: self.closed.clone(),
            media: self.media.clone(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The side this peer actually played once `Connected`. Differs from
    /// [`Negotiator::role`] for the polite peer after glare.
    pub fn completed_as(&self) -> Option<Role> {
        self.completed_as
    }

    pub fn remote_peer(&self) -> Option<PeerId> {
        self.remote_peer
    }

    pub fn buffered_candidates(&self) -> usize {
        self.buffer.len()
    }

    /// Lower id yields.
    pub fn is_polite_towards(&self, remote: &PeerId) -> bool {
        self.local_peer < *remote
    }

    pub async fn start_negotiation(&mut self) -> Result<(), NegotiationError> {
        self.ensure_open()?;

        if self.role != Role::Initiator {
            return Err(NegotiationError::NotInitiator);
        }
        if self.phase != NegotiationPhase::Idle {
            return Err(NegotiationError::Stale {
                kind: "start",
                phase: self.phase,
            });
        }

        self.transition(NegotiationPhase::LocalOfferPending);
        let offer = self.media.create_offer().await;
        self.ensure_open()?;
        let offer = match offer {
            Ok(offer) => offer,
            Err(e) => return Err(self.fail(e).await),
        };

        self.transmit(ClientMessage::Offer {
            room: self.room.clone(),
            sdp: offer.sdp,
        })?;
        self.transition(NegotiationPhase::AwaitingAnswer);
        Ok(())
    }

    pub async fn on_offer_received(
        &mut self,
        from: PeerId,
        sdp: String,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.accept_sender(from)?;

        match self.phase {
            NegotiationPhase::Idle => self.answer_offer(sdp).await,

            NegotiationPhase::AwaitingAnswer if self.is_polite_towards(&from) => {
                info!("Offer collision with {}, rolling back own offer", from);
                let rollback = self.media.rollback().await;
                self.ensure_open()?;
                if let Err(e) = rollback {
                    return Err(self.fail(e).await);
                }
                self.answer_offer(sdp).await
            }

            NegotiationPhase::AwaitingAnswer => {
                info!("Offer collision with {}, keeping own offer", from);
                Err(NegotiationError::Stale {
                    kind: "Offer",
                    phase: self.phase,
                })
            }

            phase => Err(NegotiationError::Stale {
                kind: "Offer",
                phase,
            }),
        }
    }

    pub async fn on_answer_received(
        &mut self,
        from: PeerId,
        sdp: String,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.accept_sender(from)?;

        if self.phase != NegotiationPhase::AwaitingAnswer {
            return Err(NegotiationError::Stale {
                kind: "Answer",
                phase: self.phase,
            });
        }

        let applied = self
            .media
            .set_remote_description(SessionDescription::answer(sdp))
            .await;
        self.ensure_open()?;
        if let Err(e) = applied {
            return Err(self.fail(e).await);
        }

        self.on_remote_description_set().await?;
        self.completed_as = Some(Role::Initiator);
        self.transition(NegotiationPhase::Connected);
        Ok(())
    }

    pub async fn on_candidate_received(
        &mut self,
        from: PeerId,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.accept_sender(from)?;

        if self.has_remote_description {
            self.apply_candidate(candidate).await;
        } else {
            self.buffer.push(candidate);
            debug!(
                "No remote description yet, {} candidate(s) buffered",
                self.buffer.len()
            );
        }
        Ok(())
    }

    pub async fn close(&mut self) {
        if self.phase == NegotiationPhase::Closed {
            return;
        }
        self.closer().close().await;
        self.finish_closed();
    }

    async fn answer_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        self.transition(NegotiationPhase::RemoteOfferReceived);

        let applied = self
            .media
            .set_remote_description(SessionDescription::offer(sdp))
            .await;
        self.ensure_open()?;
        if let Err(e) = applied {
            return Err(self.fail(e).await);
        }
        self.on_remote_description_set().await?;

        let answer = self.media.create_answer().await;
        self.ensure_open()?;
        let answer = match answer {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(e).await),
        };

        self.transmit(ClientMessage::Answer {
            room: self.room.clone(),
            sdp: answer.sdp,
        })?;
        self.transition(NegotiationPhase::AnswerSent);
        self.completed_as = Some(Role::Responder);
        self.transition(NegotiationPhase::Connected);
        Ok(())
    }

    async fn on_remote_description_set(&mut self) -> Result<(), NegotiationError> {
        self.has_remote_description = true;

        let pending = self.buffer.drain();
        let count = pending.len();
        if count > 0 {
            debug!("Flushing {} buffered candidate(s)", count);
        }
        for candidate in pending {
            self.ensure_open()?;
            self.apply_candidate(candidate).await;
        }
        self.ensure_open()
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.media.add_candidate(candidate).await {
            warn!("Candidate rejected by media stack, continuing: {:#}", e);
        }
    }

    fn accept_sender(&mut self, from: PeerId) -> Result<(), NegotiationError> {
        match self.remote_peer {
            None => {
                self.remote_peer = Some(from);
                Ok(())
            }
            Some(expected) if expected == from => Ok(()),
            Some(expected) => Err(NegotiationError::UnexpectedPeer {
                expected,
                got: from,
            }),
        }
    }

    fn transmit(&self, msg: ClientMessage) -> Result<(), NegotiationError> {
        debug!("Sending {} to room '{}'", msg.kind(), self.room);
        self.outbound
            .send(msg)
            .map_err(|_| NegotiationError::TransportClosed)
    }

    async fn fail(&mut self, e: anyhow::Error) -> NegotiationError {
        warn!("Negotiation in room '{}' failed: {:#}", self.room, e);
        self.close().await;
        NegotiationError::Media(e)
    }

    /// Catches a close requested through a [`NegotiationCloser`].
    fn ensure_open(&mut self) -> Result<(), NegotiationError> {
        if !self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.finish_closed();
        Err(NegotiationError::Closed)
    }

    fn finish_closed(&mut self) {
        if self.phase == NegotiationPhase::Closed {
            return;
        }
        self.buffer.clear();
        self.transition(NegotiationPhase::Closed);
    }

    fn transition(&mut self, next: NegotiationPhase) {
        debug!("[{}] {} -> {}", self.role, self.phase, next);
        self.phase = next;
        self.phase_tx.send_replace(next);
    }
}

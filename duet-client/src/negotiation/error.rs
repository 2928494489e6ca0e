use crate::negotiation::NegotiationPhase;
use duet_core::PeerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("negotiation is closed")]
    Closed,

    #[error("only the initiator starts negotiation")]
    NotInitiator,

    /// A message that cannot apply in the current phase. Glare resolution
    /// produces these routinely.
    #[error("stale {kind} in phase {phase}")]
    Stale {
        kind: &'static str,
        phase: NegotiationPhase,
    },

    #[error("signal from {got}, but negotiating with {expected}")]
    UnexpectedPeer { expected: PeerId, got: PeerId },

    #[error("media capability failed: {0:#}")]
    Media(anyhow::Error),

    #[error("signaling transport closed")]
    TransportClosed,
}

impl NegotiationError {
    /// Errors that are expected in normal operation and only worth an
    /// informational log line.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            NegotiationError::Stale { .. } | NegotiationError::UnexpectedPeer { .. }
        )
    }
}

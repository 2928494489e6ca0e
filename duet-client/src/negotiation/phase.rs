use std::fmt;

/// Which side of the offer/answer exchange a peer was set up to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    /// Initiator is producing its offer.
    LocalOfferPending,
    AwaitingAnswer,
    /// Remote offer is being applied, answer not produced yet.
    RemoteOfferReceived,
    AnswerSent,
    Connected,
    Closed,
}

impl NegotiationPhase {
    pub fn is_terminal(self) -> bool {
        self == NegotiationPhase::Closed
    }
}

impl fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// One connectivity candidate, in the shape browsers produce for
/// `RTCIceCandidateInit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Messages a client sends to the signaling server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d")]
pub enum ClientMessage {
    Join { room: RoomId },
    Leave { room: RoomId },
    Offer { room: RoomId, sdp: String },
    Answer { room: RoomId, sdp: String },
    Candidate { room: RoomId, candidate: IceCandidate },
    FindMatch { interests: String },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "Join",
            ClientMessage::Leave { .. } => "Leave",
            ClientMessage::Offer { .. } => "Offer",
            ClientMessage::Answer { .. } => "Answer",
            ClientMessage::Candidate { .. } => "Candidate",
            ClientMessage::FindMatch { .. } => "FindMatch",
        }
    }

    pub fn room(&self) -> Option<&RoomId> {
        match self {
            ClientMessage::Join { room }
            | ClientMessage::Leave { room }
            | ClientMessage::Offer { room, .. }
            | ClientMessage::Answer { room, .. }
            | ClientMessage::Candidate { room, .. } => Some(room),
            ClientMessage::FindMatch { .. } => None,
        }
    }
}

/// Negotiation payload as carried through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayedPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate { candidate: IceCandidate },
}

impl RelayedPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayedPayload::Offer { .. } => "Offer",
            RelayedPayload::Answer { .. } => "Answer",
            RelayedPayload::Candidate { .. } => "Candidate",
        }
    }

    /// Wraps the payload for delivery, stamping the sender.
    pub fn deliver(self, room: RoomId, from: PeerId) -> ServerMessage {
        match self {
            RelayedPayload::Offer { sdp } => ServerMessage::Offer { room, from, sdp },
            RelayedPayload::Answer { sdp } => ServerMessage::Answer { room, from, sdp },
            RelayedPayload::Candidate { candidate } => ServerMessage::Candidate {
                room,
                from,
                candidate,
            },
        }
    }
}

/// Wire-level error codes the server reports to the originating client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    MalformedMessage,
    RoomFull,
}

/// Messages the signaling server sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d")]
pub enum ServerMessage {
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Welcome {
        peer_id: PeerId,
    },
    Joined {
        room: RoomId,
        peers: Vec<PeerId>,
    },
    Offer {
        room: RoomId,
        from: PeerId,
        sdp: String,
    },
    Answer {
        room: RoomId,
        from: PeerId,
        sdp: String,
    },
    Candidate {
        room: RoomId,
        from: PeerId,
        candidate: IceCandidate,
    },
    Matched {
        room: RoomId,
        peer: PeerId,
    },
    Evicted {
        room: RoomId,
    },
    /// `peer` is no longer in `room`, whether it left, dropped its
    /// connection, moved elsewhere or was evicted.
    PeerLeft {
        room: RoomId,
        peer: PeerId,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::IceConfig { .. } => "IceConfig",
            ServerMessage::Welcome { .. } => "Welcome",
            ServerMessage::Joined { .. } => "Joined",
            ServerMessage::Offer { .. } => "Offer",
            ServerMessage::Answer { .. } => "Answer",
            ServerMessage::Candidate { .. } => "Candidate",
            ServerMessage::Matched { .. } => "Matched",
            ServerMessage::Evicted { .. } => "Evicted",
            ServerMessage::PeerLeft { .. } => "PeerLeft",
            ServerMessage::Error { .. } => "Error",
        }
    }
}

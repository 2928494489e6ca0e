use anyhow::Result;
use async_trait::async_trait;
use duet_core::{IceCandidate, SessionDescription};

/// The point-to-point media stack, seen only through the handful of
/// operations negotiation needs.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Produce an offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Produce an answer to the current remote offer and apply it locally.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Drop a local offer that has not been answered.
    async fn rollback(&self) -> Result<()>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Things the media stack reports on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// A locally gathered candidate to send to the remote peer.
    LocalCandidate(IceCandidate),
    RemoteStream { stream_id: String, track_id: String },
    ConnectionLost,
}

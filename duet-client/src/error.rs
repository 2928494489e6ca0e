use crate::negotiation::NegotiationError;
use duet_core::ErrorCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("signaling connection closed")]
    Closed,

    #[error("no {expected} from signaling server within {timeout:?}")]
    Timeout {
        expected: &'static str,
        timeout: Duration,
    },

    #[error("server refused request ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

use crate::model::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid signaling frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} message without a room id")]
    MissingRoom { kind: &'static str },
}

impl ProtocolError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::MalformedMessage
    }
}

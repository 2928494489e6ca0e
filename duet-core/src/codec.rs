use crate::error::ProtocolError;
use crate::model::{ClientMessage, ServerMessage};

/// Decodes and validates one client frame. Anything that fails here never
/// reaches the registry or the relay.
pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    let msg: ClientMessage = serde_json::from_str(text)?;

    if let Some(room) = msg.room() {
        if room.is_blank() {
            return Err(ProtocolError::MissingRoom { kind: msg.kind() });
        }
    }

    Ok(msg)
}

pub fn decode_server(text: &str) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_client(msg: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn encode_server(msg: &ServerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

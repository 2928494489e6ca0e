use crate::room::RelayCommand;
use crate::signaling::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duet_core::codec::decode_client;
use duet_core::{ClientMessage, PeerId, RelayedPayload, ServerMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct AppState {
    pub signaling: SignalingService,
    pub relay_tx: mpsc::Sender<RelayCommand>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let peer_id = PeerId::new();
    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, state))
}

/// Same as [`ws_handler`] but lets the client pick its id. A value that is
/// not a UUID is replaced by a fresh one. An id that already has a live
/// socket is refused with 409.
pub async fn ws_handler_with_id(
    ws: WebSocketUpgrade,
    Path(peer_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let peer_id = peer_id.parse().unwrap_or_else(|_| {
        warn!("Rejected peer id '{}', assigning a fresh one", peer_id);
        PeerId::new()
    });
    if state.signaling.is_connected(&peer_id) {
        warn!("Peer id {} is already connected, upgrade refused", peer_id);
        return StatusCode::CONFLICT.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, state))
        .into_response()
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, state: Arc<AppState>) {
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Two upgrades for the same id can race past the handler's check.
    if !state.signaling.add_peer(peer_id, tx.clone()) {
        warn!("Peer id {} taken by another socket, closing", peer_id);
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    state.signaling.push(
        peer_id,
        ServerMessage::IceConfig {
            ice_servers: state.signaling.get_ice_servers(),
        },
    );
    state
        .signaling
        .push(peer_id, ServerMessage::Welcome { peer_id });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match decode_client(&text) {
                        Ok(client_msg) => {
                            let cmd = into_command(peer_id, client_msg);
                            if let Err(e) = state.relay_tx.send(cmd).await {
                                error!("Relay died: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Invalid message from {}: {}", peer_id, e);
                            state.signaling.push(
                                peer_id,
                                ServerMessage::Error {
                                    code: e.code(),
                                    message: e.to_string(),
                                },
                            );
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Runs once per socket, whichever side ended first.
    if state.signaling.owns(&peer_id, &tx) {
        if let Err(e) = state
            .relay_tx
            .send(RelayCommand::Disconnect { peer_id })
            .await
        {
            error!("Relay died before disconnect of {}: {}", peer_id, e);
        }
    }

    state.signaling.remove_peer(&peer_id, &tx);
    info!("WebSocket disconnected: {}", peer_id);
}

fn into_command(peer_id: PeerId, msg: ClientMessage) -> RelayCommand {
    match msg {
        ClientMessage::Join { room } => RelayCommand::Join { peer_id, room },
        ClientMessage::Leave { room } => RelayCommand::Leave { peer_id, room },
        ClientMessage::FindMatch { interests } => RelayCommand::FindMatch { peer_id, interests },
        ClientMessage::Offer { room, sdp } => RelayCommand::Forward {
            peer_id,
            room,
            payload: RelayedPayload::Offer { sdp },
        },
        ClientMessage::Answer { room, sdp } => RelayCommand::Forward {
            peer_id,
            room,
            payload: RelayedPayload::Answer { sdp },
        },
        ClientMessage::Candidate { room, candidate } => RelayCommand::Forward {
            peer_id,
            room,
            payload: RelayedPayload::Candidate { candidate },
        },
    }
}

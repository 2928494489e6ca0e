use crate::error::ClientError;
use duet_core::codec::{decode_server, encode_client};
use duet_core::{ClientMessage, ErrorCode, IceServerConfig, PeerId, RoomId, ServerMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period for the server to answer our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// WebSocket connection to a duet signaling server.
///
/// Owns a reader and a writer task. Outgoing messages are queued on an
/// unbounded channel, so [`SignalingClient::sender`] handles can be given
/// to code that must not block on the socket.
pub struct SignalingClient {
    peer_id: PeerId,
    ice_servers: Vec<IceServerConfig>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    reply_timeout: Duration,
    shutdown: Option<oneshot::Sender<()>>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl SignalingClient {
    /// Connects and waits for the server's `Welcome`.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        info!("Connecting to signaling server: {}", url);

        let (ws_stream, _) = connect_async(url).await?;
        let (write, read) = ws_stream.split();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let writer = tokio::spawn(writer_task(write, outbound_rx, shutdown_rx));
        let reader = tokio::spawn(reader_task(read, inbound_tx));

        let mut client = Self {
            peer_id: PeerId::default(),
            ice_servers: Vec::new(),
            outbound: outbound_tx,
            inbound: inbound_rx,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            shutdown: Some(shutdown_tx),
            writer: Some(writer),
            reader: Some(reader),
        };

        let mut ice_servers = Vec::new();
        let welcome = client
            .wait_for("Welcome", |msg| match msg {
                ServerMessage::IceConfig { ice_servers: servers } => {
                    ice_servers = servers;
                    None
                }
                ServerMessage::Welcome { peer_id } => Some(peer_id),
                _ => None,
            })
            .await;

        match welcome {
            Ok(peer_id) => {
                info!("Connected to signaling server as {}", peer_id);
                client.peer_id = peer_id;
                client.ice_servers = ice_servers;
                Ok(client)
            }
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Relays announced by the server on connect.
    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outbound.clone()
    }

    pub fn send(&self, msg: ClientMessage) -> Result<(), ClientError> {
        self.outbound.send(msg).map_err(|_| ClientError::Closed)
    }

    /// Next message from the server. `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.inbound.recv().await
    }

    /// Joins `room` and returns the members that were already there.
    pub async fn join(&mut self, room: RoomId) -> Result<Vec<PeerId>, ClientError> {
        self.send(ClientMessage::Join { room: room.clone() })?;
        self.wait_for("Joined", |msg| match msg {
            ServerMessage::Joined { room: joined, peers } if joined == room => Some(peers),
            _ => None,
        })
        .await
    }

    pub fn leave(&self, room: RoomId) -> Result<(), ClientError> {
        self.send(ClientMessage::Leave { room })
    }

    /// Asks the server for a partner. Resolves with the room to join and the
    /// partner's id.
    ///
    /// There is no timeout here: waiting for a partner may take arbitrarily
    /// long.
    pub async fn find_match(&mut self, interests: &str) -> Result<(RoomId, PeerId), ClientError> {
        self.send(ClientMessage::FindMatch {
            interests: interests.to_owned(),
        })?;

        loop {
            match self.inbound.recv().await.ok_or(ClientError::Closed)? {
                ServerMessage::Matched { room, peer } => return Ok((room, peer)),
                ServerMessage::Error { code, message } if code == ErrorCode::RoomFull => {
                    return Err(ClientError::Rejected { code, message });
                }
                ServerMessage::Error { code, message } => {
                    warn!("Server reported {:?} while waiting for a match: {}", code, message);
                }
                other => debug!("Skipping {} while waiting for a match", other.kind()),
            }
        }
    }

    /// Reads messages until `pick` accepts one. A `RoomFull` error ends the
    /// wait. Other errors answer earlier frames and are skipped.
    pub async fn wait_for<T>(
        &mut self,
        expected: &'static str,
        mut pick: impl FnMut(ServerMessage) -> Option<T>,
    ) -> Result<T, ClientError> {
        let timeout = self.reply_timeout;
        let inbound = &mut self.inbound;

        let wait = async {
            loop {
                let msg = inbound.recv().await.ok_or(ClientError::Closed)?;
                if let ServerMessage::Error { code, message } = msg {
                    if code == ErrorCode::RoomFull {
                        return Err(ClientError::Rejected { code, message });
                    }
                    warn!(
                        "Server reported {:?} while waiting for {}: {}",
                        code, expected, message
                    );
                    continue;
                }
                let kind = msg.kind();
                match pick(msg) {
                    Some(value) => return Ok(value),
                    None => debug!("Skipping {} while waiting for {}", kind, expected),
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ClientError::Timeout { expected, timeout })?
    }

    /// Flushes queued messages, sends a close frame and waits for both tasks.
    pub async fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());

        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(mut reader) = self.reader.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
                debug!("Server did not acknowledge close, dropping reader");
                reader.abort();
            }
        }
        info!("Disconnected from signaling server");
    }
}

async fn writer_task(
    mut write: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            // Drain everything queued before honoring shutdown.
            biased;

            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                let text = match encode_client(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {}: {}", msg.kind(), e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    warn!("Failed to send {}: {}", msg.kind(), e);
                    break;
                }
            }

            _ = &mut shutdown => break,
        }
    }

    let _ = write.send(Message::Close(None)).await;
    debug!("Signaling writer finished");
}

async fn reader_task(
    mut read: SplitStream<WsStream>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_server(text.as_str()) {
                Ok(msg) => {
                    if inbound.send(msg).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Undecodable message from server: {}", e),
            },
            Ok(Message::Close(_)) => {
                info!("Signaling server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Signaling connection error: {}", e);
                break;
            }
        }
    }

    debug!("Signaling reader finished");
}

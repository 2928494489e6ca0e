use anyhow::{Context, Result, bail};
use duet_core::codec::{decode_server, encode_client};
use duet_core::{ClientMessage, PeerId, ServerMessage};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::SIGNAL_TIMEOUT_MS;

/// Bare WebSocket peer speaking the JSON protocol directly.
pub struct WsTestClient {
    pub peer_id: PeerId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTestClient {
    /// Connects and consumes the IceConfig + Welcome greeting.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_url(format!("ws://{}/ws", addr)).await
    }

    /// Connects on the route that lets the client pick its own id.
    pub async fn connect_as(addr: SocketAddr, peer_id: PeerId) -> Result<Self> {
        Self::connect_url(format!("ws://{}/ws/{}", addr, peer_id)).await
    }

    async fn connect_url(url: String) -> Result<Self> {
        let (stream, _) = connect_async(url).await.context("Failed to connect")?;

        let mut client = Self {
            peer_id: PeerId::new(),
            stream,
        };

        let ServerMessage::IceConfig { .. } = client.recv().await? else {
            bail!("Expected IceConfig first");
        };
        let ServerMessage::Welcome { peer_id } = client.recv().await? else {
            bail!("Expected Welcome second");
        };
        client.peer_id = peer_id;

        Ok(client)
    }

    pub async fn send(&mut self, msg: ClientMessage) -> Result<()> {
        self.send_raw(&encode_client(&msg)?).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_owned().into())).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<ServerMessage> {
        let timeout = Duration::from_millis(SIGNAL_TIMEOUT_MS);
        loop {
            let frame = tokio::time::timeout(timeout, self.stream.next())
                .await
                .context("Timeout waiting for server message")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(decode_server(&text)?),
                Some(Ok(Message::Close(_))) | None => bail!("Connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Succeeds when nothing arrives within `ms`.
    pub async fn expect_silence(&mut self, ms: u64) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(ms), self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(frame) => bail!("Unexpected frame: {:?}", frame),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

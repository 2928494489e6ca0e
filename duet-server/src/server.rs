use crate::config::ServerConfig;
use crate::room::{Relay, RelayCommand};
use crate::signaling::{AppState, SignalingService, ws_handler, ws_handler_with_id};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

/// Builds the HTTP router around an already running relay.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/ws/{peer_id}", get(ws_handler_with_id))
        .with_state(state)
}

/// A bound signaling server, ready to serve.
pub struct SignalingServer {
    listener: TcpListener,
    app: Router,
    relay_tx: mpsc::Sender<RelayCommand>,
}

impl SignalingServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let relay_tx = Relay::spawn(&config, Arc::new(signaling.clone()));

        let state = Arc::new(AppState {
            signaling,
            relay_tx: relay_tx.clone(),
        });

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

        Ok(Self {
            listener,
            app: router(state),
            relay_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Command queue of the relay, for inspection.
    pub fn relay(&self) -> mpsc::Sender<RelayCommand> {
        self.relay_tx.clone()
    }

    pub async fn run(self) -> Result<()> {
        info!("Signaling server listening on ws://{}/ws", self.local_addr()?);
        axum::serve(self.listener, self.app)
            .await
            .context("Signaling server stopped")
    }
}

use crate::media::{MediaEvent, MediaSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use duet_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use duet_core::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use webrtc::api::{API, APIBuilder};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// [`MediaSession`] backed by a webrtc-rs peer connection.
///
/// webrtc-rs cannot roll back a local offer, so [`MediaSession::rollback`]
/// swaps in a fresh peer connection built from the same configuration.
pub struct WebRtcMedia {
    api: API,
    rtc_config: RTCConfiguration,
    events: mpsc::UnboundedSender<MediaEvent>,
    connection: RwLock<Connection>,
}

struct Connection {
    peer_connection: Arc<RTCPeerConnection>,
    /// Gives the offer an application section so ICE has something to do.
    _data_channel: Arc<RTCDataChannel>,
}

impl WebRtcMedia {
    /// Builds the peer connection. Gathered candidates, remote tracks and
    /// connection loss are reported on the returned channel.
    pub async fn new(
        ice_servers: &[IceServerConfig],
    ) -> Result<(Self, mpsc::UnboundedReceiver<MediaEvent>)> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: rtc_ice_servers(ice_servers),
            ..Default::default()
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connection = build_connection(&api, rtc_config.clone(), event_tx.clone()).await?;

        Ok((
            Self {
                api,
                rtc_config,
                events: event_tx,
                connection: RwLock::new(connection),
            },
            event_rx,
        ))
    }

    async fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        self.connection.read().await.peer_connection.clone()
    }
}

async fn build_connection(
    api: &API,
    rtc_config: RTCConfiguration,
    event_tx: mpsc::UnboundedSender<MediaEvent>,
) -> Result<Connection> {
    let peer_connection = Arc::new(
        api.new_peer_connection(rtc_config)
            .await
            .context("Failed to create peer connection")?,
    );

    let state_tx = event_tx.clone();
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                info!("Peer connection state: {:?}", s);
                if matches!(
                    s,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected
                ) {
                    let _ = tx.send(MediaEvent::ConnectionLost);
                }
            })
        },
    ));

    let ice_tx = event_tx.clone();
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let tx = ice_tx.clone();
        Box::pin(async move {
            let Some(candidate) = c else { return };
            let Ok(init) = candidate.to_json() else {
                return;
            };
            let _ = tx.send(MediaEvent::LocalCandidate(IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
                username_fragment: init.username_fragment,
            }));
        })
    }));

    let track_tx = event_tx;
    peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
        let tx = track_tx.clone();
        Box::pin(async move {
            debug!("Remote track {} in stream {}", track.id(), track.stream_id());
            let _ = tx.send(MediaEvent::RemoteStream {
                stream_id: track.stream_id(),
                track_id: track.id(),
            });
        })
    }));

    let data_channel = peer_connection
        .create_data_channel("duet", None)
        .await
        .context("Failed to create data channel")?;

    Ok(Connection {
        peer_connection,
        _data_channel: data_channel,
    })
}

fn rtc_ice_servers(servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    if servers.is_empty() {
        return vec![RTCIceServer {
            urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
            ..Default::default()
        }];
    }

    servers
        .iter()
        .map(|s| RTCIceServer {
            urls: s.urls.clone(),
            username: s.username.clone().unwrap_or_default(),
            credential: s.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect()
}

#[async_trait]
impl MediaSession for WebRtcMedia {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let pc = self.peer_connection().await;
        let offer = pc.create_offer(None).await?;
        pc.set_local_description(offer.clone()).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let pc = self.peer_connection().await;
        let answer = pc.create_answer(None).await?;
        pc.set_local_description(answer.clone()).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.peer_connection()
            .await
            .set_remote_description(desc)
            .await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let fresh = build_connection(&self.api, self.rtc_config.clone(), self.events.clone())
            .await
            .context("Failed to roll back local offer")?;

        let stale = std::mem::replace(&mut *self.connection.write().await, fresh);
        debug!("Discarded peer connection holding the local offer");
        if let Err(e) = stale.peer_connection.close().await {
            debug!("Closing the discarded peer connection failed: {}", e);
        }
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection().await.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection().await.close().await?;
        Ok(())
    }
}

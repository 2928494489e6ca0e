use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::Input;
use duet_client::{
    PeerSession, Role, RolePolicy, SessionConfig, SessionEvent, SignalingClient, WebRtcMedia,
};
use duet_core::RoomId;
use duet_server::{CapacityPolicy, ServerConfig, SignalingServer, ice_servers_from};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet", version, about = "One-to-one WebRTC rendezvous")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve {
        #[arg(long, env = "DUET_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        #[arg(long, env = "DUET_STUN_URL")]
        stun_url: Option<String>,

        #[arg(long, env = "DUET_TURN_URL")]
        turn_url: Option<String>,

        #[arg(long, env = "DUET_TURN_USERNAME", requires = "turn_url")]
        turn_username: Option<String>,

        #[arg(long, env = "DUET_TURN_CREDENTIAL", requires = "turn_url")]
        turn_credential: Option<String>,

        /// `reject` or `evict-oldest`.
        #[arg(long, env = "DUET_CAPACITY_POLICY", default_value = "reject")]
        capacity_policy: CapacityPolicy,
    },

    /// Join a room and negotiate a peer connection with whoever is there.
    Call {
        #[arg(long, env = "DUET_URL", default_value = "ws://127.0.0.1:3000/ws")]
        url: String,

        /// Prompted for when neither this nor `--find-match` is given.
        #[arg(long, conflicts_with = "find_match")]
        room: Option<String>,

        /// Let the server pair us with a stranger.
        #[arg(long, value_name = "INTERESTS")]
        find_match: Option<String>,

        #[arg(long, value_enum, default_value_t = RoleArg::Auto)]
        role: RoleArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Auto,
    Initiator,
    Responder,
}

impl From<RoleArg> for RolePolicy {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Auto => RolePolicy::Auto,
            RoleArg::Initiator => RolePolicy::Fixed(Role::Initiator),
            RoleArg::Responder => RolePolicy::Fixed(Role::Responder),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve {
            bind,
            stun_url,
            turn_url,
            turn_username,
            turn_credential,
            capacity_policy,
        } => {
            let config = ServerConfig {
                bind_addr: bind,
                ice_servers: ice_servers_from(stun_url, turn_url, turn_username, turn_credential),
                capacity_policy,
                ..ServerConfig::default()
            };
            serve(config).await
        }
        Commands::Call {
            url,
            room,
            find_match,
            role,
        } => call(&url, room, find_match, role.into()).await,
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let server = SignalingServer::bind(config).await?;
    println!(
        "{} {}",
        "Signaling server listening on".green().bold(),
        server.local_addr()?
    );

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

async fn call(
    url: &str,
    room: Option<String>,
    interests: Option<String>,
    role: RolePolicy,
) -> Result<()> {
    let mut client = SignalingClient::connect(url)
        .await
        .with_context(|| format!("Failed to reach signaling server at {}", url))?;
    println!("{} {}", "Connected as".green(), client.peer_id());

    let room = match (room, interests) {
        (Some(room), _) => RoomId::from(room),
        (None, Some(interests)) => {
            println!("{}", "Waiting for a partner...".cyan());
            let (room, peer) = client.find_match(&interests).await?;
            println!("{} {} in '{}'", "Matched with".green(), peer, room);
            room
        }
        (None, None) => prompt_room().await?,
    };

    let (media, events) = WebRtcMedia::new(client.ice_servers()).await?;
    let config = SessionConfig { room, role };
    let mut session = PeerSession::open(client, Arc::new(media), events, config)
        .await
        .context("Failed to join room")?;

    println!(
        "{} '{}' as {}. Press Ctrl-C to hang up.",
        "Joined".green().bold(),
        session.room(),
        session.role()
    );

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(SessionEvent::PhaseChanged(phase)) => {
                    println!("{} {}", "Negotiation:".cyan(), phase);
                    if phase.is_terminal() {
                        break;
                    }
                }
                Some(SessionEvent::RemoteStream { stream_id, track_id }) => {
                    println!("{} {} ({})", "Remote stream".green(), stream_id, track_id);
                }
                Some(SessionEvent::PeerGone) => {
                    println!("{}", "Peer left the call".yellow());
                    break;
                }
                Some(SessionEvent::Evicted) => {
                    println!("{}", "Someone else took this seat".yellow());
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.close().await;
    println!("{}", "Call ended".bold());
    Ok(())
}

async fn prompt_room() -> Result<RoomId> {
    let room = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Room")
            .validate_with(|input: &String| {
                if input.trim().is_empty() {
                    Err("room must not be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()
    })
    .await??;
    Ok(RoomId::from(room.trim()))
}

use anyhow::{Context, Result, bail};
use duet_core::IceServerConfig;
use duet_core::utils::DEFAULT_STUN_ADDR;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// What happens when a third peer joins a one-to-one room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapacityPolicy {
    /// Refuse the join with `RoomFull`.
    #[default]
    Reject,
    /// Push out the least recently joined member.
    EvictOldest,
}

impl FromStr for CapacityPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "evict-oldest" | "evict_oldest" | "evict" => Ok(Self::EvictOldest),
            other => bail!("unknown capacity policy '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Handed to every client on connect.
    pub ice_servers: Vec<IceServerConfig>,
    pub capacity_policy: CapacityPolicy,
    /// Depth of the relay command queue.
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            capacity_policy: CapacityPolicy::Reject,
            command_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `DUET_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bind) = env::var("DUET_BIND") {
            config.bind_addr = bind
                .parse()
                .with_context(|| format!("DUET_BIND is not a socket address: {}", bind))?;
        }

        let stun = env::var("DUET_STUN_URL").ok();
        let turn = env::var("DUET_TURN_URL").ok();
        config.ice_servers = ice_servers_from(
            stun,
            turn,
            env::var("DUET_TURN_USERNAME").ok(),
            env::var("DUET_TURN_CREDENTIAL").ok(),
        );

        if let Ok(policy) = env::var("DUET_CAPACITY_POLICY") {
            config.capacity_policy = policy.parse()?;
        }

        Ok(config)
    }
}

/// Builds the relay list: an optional STUN url (public default when absent)
/// followed by an optional TURN url with its credentials.
pub fn ice_servers_from(
    stun_url: Option<String>,
    turn_url: Option<String>,
    turn_username: Option<String>,
    turn_credential: Option<String>,
) -> Vec<IceServerConfig> {
    let mut servers = vec![IceServerConfig::stun(
        stun_url.unwrap_or_else(|| DEFAULT_STUN_ADDR.to_owned()),
    )];

    if let Some(turn_url) = turn_url {
        servers.push(IceServerConfig {
            urls: vec![turn_url],
            username: turn_username,
            credential: turn_credential,
        });
    }

    servers
}

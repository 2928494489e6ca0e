mod peer_session;
mod session_config;

pub use peer_session::*;
pub use session_config::*;

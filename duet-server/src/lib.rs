mod config;
mod matchmaking;
mod room;
mod server;
mod signaling;

pub use config::*;
pub use matchmaking::*;
pub use room::*;
pub use server::*;
pub use signaling::*;

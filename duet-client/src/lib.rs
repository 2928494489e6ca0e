mod error;
mod media;
mod negotiation;
mod session;
mod signaling;

pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use session::*;
pub use signaling::*;

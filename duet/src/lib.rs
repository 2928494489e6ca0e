pub use duet_core::{PeerId, RoomId};

pub mod model {
    pub use duet_core::model::*;
}

pub mod codec {
    pub use duet_core::codec::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use duet_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use duet_client::*;
}

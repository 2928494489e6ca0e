mod media_session;
mod webrtc_media;

pub use media_session::*;
pub use webrtc_media::*;

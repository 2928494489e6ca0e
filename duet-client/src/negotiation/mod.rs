mod candidate_buffer;
mod error;
mod negotiator;
mod phase;

pub use candidate_buffer::*;
pub use error::*;
pub use negotiator::*;
pub use phase::*;

use duet_core::{PeerId, RoomId};
use std::collections::VecDeque;
use tracing::debug;

/// Two peers the matchmaker decided belong together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub room: RoomId,
    pub first: PeerId,
    pub second: PeerId,
}

/// Pairs peers asking for a partner. Runs on the relay task, so
/// implementations need no locking.
pub trait Matchmaker: Send + Sync {
    fn enqueue(&mut self, peer_id: PeerId, interests: &str) -> Option<MatchPair>;

    /// Forget a peer that went away while waiting.
    fn withdraw(&mut self, peer_id: &PeerId);
}

/// First come, first paired. Interests are ignored.
#[derive(Default)]
pub struct QueueMatchmaker {
    waiting: VecDeque<PeerId>,
}

impl QueueMatchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }
}

impl Matchmaker for QueueMatchmaker {
    fn enqueue(&mut self, peer_id: PeerId, interests: &str) -> Option<MatchPair> {
        debug!("Peer {} looking for a match ({:?})", peer_id, interests);

        if self.waiting.contains(&peer_id) {
            return None;
        }

        let Some(first) = self.waiting.pop_front() else {
            self.waiting.push_back(peer_id);
            return None;
        };

        Some(MatchPair {
            room: RoomId::generate(),
            first,
            second: peer_id,
        })
    }

    fn withdraw(&mut self, peer_id: &PeerId) {
        self.waiting.retain(|p| p != peer_id);
    }
}

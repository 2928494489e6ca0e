use duet_core::IceCandidate;
use std::collections::VecDeque;
use std::collections::vec_deque::IntoIter;

/// Candidates that arrived before any remote description was set.
///
/// Draining hands each queued candidate out exactly once, oldest first.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    queue: VecDeque<IceCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.queue.push_back(candidate);
    }

    pub fn drain(&mut self) -> IntoIter<IceCandidate> {
        std::mem::take(&mut self.queue).into_iter()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

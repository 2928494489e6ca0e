use crate::config::CapacityPolicy;
use duet_core::utils::ROOM_CAPACITY;
use duet_core::{PeerId, RoomId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("room '{room}' already has {capacity} members")]
    RoomFull { room: RoomId, capacity: usize },
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub room: RoomId,
    /// Members that were already present, oldest first.
    pub peers: Vec<PeerId>,
    /// Member pushed out under [`CapacityPolicy::EvictOldest`].
    pub evicted: Option<PeerId>,
    /// Room the peer was moved out of, if it was elsewhere.
    pub moved_from: Option<RoomId>,
}

/// Room table plus the reverse index from peer to room.
///
/// Both maps are only ever touched together inside one `&mut self` call, so
/// a room's member list and a peer's room association cannot disagree.
pub struct RoomRegistry {
    /// Members in join order.
    rooms: HashMap<RoomId, Vec<PeerId>>,
    memberships: HashMap<PeerId, RoomId>,
    policy: CapacityPolicy,
    capacity: usize,
}

impl RoomRegistry {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            policy,
            capacity: ROOM_CAPACITY,
        }
    }

    pub fn join(&mut self, peer_id: PeerId, room: RoomId) -> Result<Joined, RegistryError> {
        if self.memberships.get(&peer_id) == Some(&room) {
            debug!("Peer {} re-joined room '{}'", peer_id, room);
            return Ok(Joined {
                peers: self.others(&room, &peer_id),
                room,
                evicted: None,
                moved_from: None,
            });
        }

        let occupied = self.rooms.get(&room).map_or(0, Vec::len);
        if occupied >= self.capacity && self.policy == CapacityPolicy::Reject {
            return Err(RegistryError::RoomFull {
                room,
                capacity: self.capacity,
            });
        }

        let moved_from = self.disconnect(&peer_id);

        let evicted = if occupied >= self.capacity {
            let oldest = self.rooms.get(&room).and_then(|m| m.first().copied());
            if let Some(oldest) = oldest {
                info!("Evicting {} from full room '{}'", oldest, room);
                self.remove(&oldest, &room);
            }
            oldest
        } else {
            None
        };

        let members = self.rooms.entry(room.clone()).or_default();
        let peers = members.clone();
        if peers.is_empty() {
            info!("Creating room '{}'", room);
        }
        members.push(peer_id);
        self.memberships.insert(peer_id, room.clone());

        Ok(Joined {
            room,
            peers,
            evicted,
            moved_from,
        })
    }

    /// Removes `peer_id` from `room`. Returns false, and changes nothing, when
    /// the peer is not a member of that room.
    pub fn leave(&mut self, peer_id: &PeerId, room: &RoomId) -> bool {
        if self.memberships.get(peer_id) != Some(room) {
            return false;
        }
        self.remove(peer_id, room);
        true
    }

    /// Leaves whatever room the peer occupies.
    pub fn disconnect(&mut self, peer_id: &PeerId) -> Option<RoomId> {
        let room = self.memberships.get(peer_id)?.clone();
        self.remove(peer_id, &room);
        Some(room)
    }

    /// Members a message from `sender` addressed to `room` goes to. `None`
    /// when the sender is not in that room.
    pub fn recipients(&self, sender: &PeerId, room: &RoomId) -> Option<Vec<PeerId>> {
        if self.memberships.get(sender) != Some(room) {
            return None;
        }
        Some(self.others(room, sender))
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<&RoomId> {
        self.memberships.get(peer_id)
    }

    pub fn members(&self, room: &RoomId) -> Vec<PeerId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn others(&self, room: &RoomId, peer_id: &PeerId) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|m| m.iter().filter(|p| *p != peer_id).copied().collect())
            .unwrap_or_default()
    }

    fn remove(&mut self, peer_id: &PeerId, room: &RoomId) {
        self.memberships.remove(peer_id);

        let Some(members) = self.rooms.get_mut(room) else {
            return;
        };
        members.retain(|p| p != peer_id);
        if members.is_empty() {
            self.rooms.remove(room);
            info!("Room '{}' is empty, destroyed", room);
        }
    }
}

use crate::negotiation::Role;
use duet_core::RoomId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RolePolicy {
    /// The peer that finds someone already in the room initiates.
    #[default]
    Auto,
    /// Play this role regardless of arrival order. Negotiation then waits for
    /// an explicit [`PeerSession::start`](crate::PeerSession::start).
    Fixed(Role),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room: RoomId,
    pub role: RolePolicy,
}

impl SessionConfig {
    pub fn new(room: impl Into<RoomId>) -> Self {
        Self {
            room: room.into(),
            role: RolePolicy::Auto,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = RolePolicy::Fixed(role);
        self
    }
}

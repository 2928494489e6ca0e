pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// A one-to-one session never has more than two members in a room.
pub const ROOM_CAPACITY: usize = 2;

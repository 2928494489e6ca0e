mod test_evict_oldest;
mod test_third_peer_gets_room_full;

mod test_candidates_keep_sender_order;

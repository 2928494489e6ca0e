mod test_third_session_is_rejected;

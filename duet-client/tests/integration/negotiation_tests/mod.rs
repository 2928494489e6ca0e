mod test_close_during_media_call;
mod test_glare_resolution;
mod test_media_failures;

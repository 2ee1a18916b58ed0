mod test_early_ice_is_buffered;
mod test_duplicate_offer_is_ignored;
mod test_relay_pushes;
mod test_viewer_resets;

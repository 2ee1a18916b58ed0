mod test_concurrent_joins_start_once;
mod test_link_failure_stops_broadcast;

mod peer_manager;

pub use peer_manager::*;

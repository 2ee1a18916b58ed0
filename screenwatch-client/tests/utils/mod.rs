pub mod hub_transport;

pub use fake_peer::*;
pub use hub_transport::*;
pub use mock_capture::*;

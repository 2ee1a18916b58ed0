pub use screenwatch_core::{Role, RoomId};

pub mod model {
    pub use screenwatch_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use screenwatch_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use screenwatch_relay::*;
}

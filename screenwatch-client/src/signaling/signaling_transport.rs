use crate::signaling::listeners::{Listener, ListenerId};
use async_trait::async_trait;
use screenwatch_core::{EventName, RelayEvent};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Reconnection policy of the relay channel.
#[derive(Debug, Clone)]
pub struct SignalingOptions {
    pub reconnection_attempts: u32,
    pub connect_timeout: Duration,
    pub reconnection_delay: Duration,
}

impl Default for SignalingOptions {
    fn default() -> Self {
        Self {
            reconnection_attempts: 5,
            connect_timeout: Duration::from_secs(10),
            reconnection_delay: Duration::from_secs(1),
        }
    }
}

/// Bidirectional, room-scoped event channel to the relay.
///
/// Delivery is best effort. Events of one name reach a listener in arrival order;
/// nothing is promised across names.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Fire-and-forget. Dropped with a warning while the channel is down.
    async fn emit(&self, event: RelayEvent);

    fn on(&self, name: EventName, listener: Listener) -> ListenerId;

    fn off(&self, name: EventName, id: ListenerId);

    fn status(&self) -> watch::Receiver<TransportStatus>;
}

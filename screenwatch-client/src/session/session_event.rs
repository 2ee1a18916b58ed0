use crate::media::RemoteStream;
use crate::negotiation::{BroadcastPhase, ViewerPhase};
use crate::signaling::TransportStatus;
use screenwatch_core::{ObserverRecord, Role, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing notification (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything the UI layer can react to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Every admin transition, transient ones included.
    BroadcastPhase(BroadcastPhase),
    ViewerPhase(ViewerPhase),
    Notice(Notice),
    ObserversChanged(Vec<ObserverRecord>),
    /// The stream the video element should show; `None` clears it.
    RemoteStream(Option<RemoteStream>),
    PermissionsUpdated(serde_json::Value),
    ScreenData(serde_json::Value),
}

/// Coarse connection state derived from the relay channel and the peer links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Relay reachable, no media session.
    Ready,
    Negotiating,
    Live,
}

/// Snapshot published after every step of the session loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub room_id: RoomId,
    pub role: Role,
    pub transport: TransportStatus,
    pub broadcast: BroadcastPhase,
    pub viewer: ViewerPhase,
    pub attempt_count: u32,
    pub start_in_flight: bool,
    pub observers: Vec<ObserverRecord>,
    pub sharing_local_stream: bool,
    pub receiving_remote_stream: bool,
}

impl SessionState {
    pub fn connection_state(&self) -> ConnectionState {
        match self.transport {
            TransportStatus::Connected => {}
            TransportStatus::Connecting | TransportStatus::Disconnected => {
                return ConnectionState::Disconnected;
            }
        }

        match (self.broadcast, self.viewer) {
            (BroadcastPhase::Broadcasting, _) | (_, ViewerPhase::Connected) => ConnectionState::Live,
            (BroadcastPhase::Starting, _) | (_, ViewerPhase::Connecting) => {
                ConnectionState::Negotiating
            }
            _ => ConnectionState::Ready,
        }
    }
}

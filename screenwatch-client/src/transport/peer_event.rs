use screenwatch_core::IceCandidate;
use std::sync::Arc;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_remote::TrackRemote;

/// Which of the two per-session connections a link is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// Admin side, sends the captured screen.
    Broadcaster,
    /// Observer side, receives it.
    Viewer,
}

/// Identity of one peer link. A recreated link gets a new generation, so callbacks
/// still in flight from the superseded one can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub role: LinkRole,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl From<RTCPeerConnectionState> for PeerState {
    fn from(s: RTCPeerConnectionState) -> Self {
        match s {
            RTCPeerConnectionState::Connecting => Self::Connecting,
            RTCPeerConnectionState::Connected => Self::Connected,
            RTCPeerConnectionState::Disconnected => Self::Disconnected,
            RTCPeerConnectionState::Failed => Self::Failed,
            RTCPeerConnectionState::Closed => Self::Closed,
            _ => Self::New,
        }
    }
}

/// Events a peer link reports back to the session loop.
pub enum PeerEvent {
    /// A local ICE candidate to forward through the relay.
    CandidateGenerated(LinkId, IceCandidate),

    /// A remote media track arrived (viewer side).
    TrackReceived(LinkId, Arc<TrackRemote>),

    StateChanged(LinkId, PeerState),
}

impl PeerEvent {
    pub fn link(&self) -> LinkId {
        match self {
            Self::CandidateGenerated(link, _)
            | Self::TrackReceived(link, _)
            | Self::StateChanged(link, _) => *link,
        }
    }
}

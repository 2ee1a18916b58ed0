pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::SessionConfig;
pub use error::{Result, SignalingError};
pub use media::{LocalStream, MediaCapture, RemoteStream, StaticTrackCapture};
pub use negotiation::{BroadcastPhase, NegotiationThrottle, ViewerPhase};
pub use peer::PeerConnectionManager;
pub use session::{
    ConnectionState, Notice, NoticeLevel, Session, SessionCommand, SessionEvent, SessionHandle,
    SessionParams, SessionState,
};
pub use signaling::{SignalingOptions, SignalingTransport, TransportStatus, WsTransport};
pub use transport::{PeerFactory, PeerLink, RtcPeerFactory, TransportConfig};

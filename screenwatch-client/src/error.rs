use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalingError>;

/// Failures of the observer signaling core.
///
/// None of these escape the session loop: each one becomes a state transition
/// plus a user-facing notice (or, for [`SignalingError::ThrottledDrop`], a log line).
#[derive(Debug, Clone, Error)]
pub enum SignalingError {
    #[error("signaling transport is disconnected")]
    TransportDisconnected,

    #[error("could not reach relay: {0}")]
    ConnectionError(String),

    #[error("screen capture permission denied: {0}")]
    CaptureDenied(String),

    #[error("screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("negotiation timed out after {0:?}")]
    NegotiationTimedOut(Duration),

    #[error("start request dropped by throttle")]
    ThrottledDrop,

    #[error("invalid relay payload: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session has shut down")]
    SessionClosed,
}

impl SignalingError {
    pub fn negotiation(msg: impl std::fmt::Display) -> Self {
        Self::NegotiationFailed(msg.to_string())
    }

    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }
}

impl From<webrtc::Error> for SignalingError {
    fn from(e: webrtc::Error) -> Self {
        Self::NegotiationFailed(e.to_string())
    }
}

impl From<serde_json::Error> for SignalingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

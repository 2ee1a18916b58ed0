use crate::error::Result;
use crate::media::LocalStream;
use crate::transport::peer_event::{LinkId, PeerEvent};
use async_trait::async_trait;
use screenwatch_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

/// One WebRTC peer connection as the peer manager sees it.
#[async_trait]
pub trait PeerLink: Send + Sync {
    fn id(&self) -> LinkId;

    /// Adds every track of a captured stream.
    async fn add_stream(&self, stream: &LocalStream) -> Result<()>;

    /// Creates an offer and sets it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Applies a remote offer, then creates and locally sets the answer.
    async fn accept_offer(&self, offer: SessionDescription) -> Result<SessionDescription>;

    async fn accept_answer(&self, answer: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds peer links; the links report callbacks into `events`.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(
        &self,
        link: LinkId,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Box<dyn PeerLink>>;
}

use crate::error::{Result, SignalingError};
use crate::media::LocalStream;
use crate::signaling::SignalingTransport;
use crate::transport::{LinkId, LinkRole, PeerEvent, PeerFactory, PeerLink};
use screenwatch_core::{
    AnswerPayload, CandidatePayload, IceCandidate, OfferPayload, RelayEvent, RoomId,
    SessionDescription,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Remote candidates kept per link role while no remote description is set.
pub const MAX_PENDING_CANDIDATES: usize = 64;

struct LinkHandle {
    link: Box<dyn PeerLink>,
    remote_applied: bool,
    /// The exact offer emitted for this link; warm joins resend it verbatim.
    current_offer: Option<SessionDescription>,
    /// The offer this (viewer) link answered.
    answered_offer: Option<SessionDescription>,
}

/// Owns the session's broadcaster and viewer peer links and mediates SDP/ICE
/// exchange through the signaling transport.
///
/// Links are never mutated into a new negotiation: starting over closes the
/// old link and builds a fresh one with a new generation.
pub struct PeerConnectionManager {
    room_id: RoomId,
    signaling: Arc<dyn SignalingTransport>,
    factory: Arc<dyn PeerFactory>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    broadcaster: Option<LinkHandle>,
    viewer: Option<LinkHandle>,
    pending_candidates: HashMap<LinkRole, VecDeque<IceCandidate>>,
    generation: u64,
}

impl PeerConnectionManager {
    pub fn new(
        room_id: RoomId,
        signaling: Arc<dyn SignalingTransport>,
        factory: Arc<dyn PeerFactory>,
        events_tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            room_id,
            signaling,
            factory,
            events_tx,
            broadcaster: None,
            viewer: None,
            pending_candidates: HashMap::new(),
            generation: 0,
        }
    }

    /// Closes any existing broadcaster link and builds a new one.
    pub async fn create_broadcaster_connection(&mut self) -> Result<LinkId> {
        self.create_link(LinkRole::Broadcaster).await
    }

    /// Closes any existing viewer link and builds a new one.
    pub async fn create_viewer_connection(&mut self) -> Result<LinkId> {
        self.create_link(LinkRole::Viewer).await
    }

    pub async fn attach_local_stream(&mut self, stream: &LocalStream) -> Result<()> {
        let handle = self
            .broadcaster
            .as_ref()
            .ok_or_else(|| SignalingError::negotiation("no broadcaster link to attach to"))?;
        handle.link.add_stream(stream).await?;
        debug!(
            "Attached {} track(s) of stream {}",
            stream.tracks().len(),
            stream.id()
        );
        Ok(())
    }

    /// Creates a new offer on the broadcaster link and emits it to the room.
    /// The new offer supersedes whatever the link offered before.
    pub async fn create_offer(&mut self) -> Result<SessionDescription> {
        let handle = self
            .broadcaster
            .as_mut()
            .ok_or_else(|| SignalingError::negotiation("no broadcaster link to offer from"))?;

        let offer = handle.link.create_offer().await?;
        handle.current_offer = Some(offer.clone());
        handle.remote_applied = false;

        self.emit_offer(offer.clone()).await;
        Ok(offer)
    }

    /// Re-emits the current broadcaster offer for a late observer.
    pub async fn resend_offer(&self) -> Result<()> {
        let offer = self
            .current_offer()
            .ok_or_else(|| SignalingError::negotiation("no offer to resend"))?;
        info!("Resending current offer to room {}", self.room_id);
        self.emit_offer(offer).await;
        Ok(())
    }

    pub fn current_offer(&self) -> Option<SessionDescription> {
        self.broadcaster.as_ref()?.current_offer.clone()
    }

    /// Whether the viewer link is already negotiating (or done with) exactly this offer.
    pub fn is_answering(&self, offer: &SessionDescription) -> bool {
        self.viewer
            .as_ref()
            .and_then(|h| h.answered_offer.as_ref())
            .is_some_and(|answered| answered.sdp == offer.sdp)
    }

    /// Applies an offer on the viewer link, answers it and emits the answer.
    /// Call once per link; a new offer needs a new viewer link.
    pub async fn accept_offer(&mut self, offer: SessionDescription) -> Result<SessionDescription> {
        let handle = self
            .viewer
            .as_mut()
            .ok_or_else(|| SignalingError::negotiation("no viewer link to answer with"))?;

        handle.answered_offer = Some(offer.clone());
        let answer = handle.link.accept_offer(offer).await?;
        handle.remote_applied = true;

        self.flush_pending(LinkRole::Viewer).await;

        self.signaling
            .emit(RelayEvent::ObserverAnswer(AnswerPayload {
                answer: answer.clone(),
                room_id: self.room_id.clone(),
            }))
            .await;
        Ok(answer)
    }

    /// Applies an observer's answer on the broadcaster link.
    ///
    /// Tolerant: with no broadcaster link, or with the current offer already
    /// answered, the answer is logged and ignored.
    pub async fn accept_answer(&mut self, answer: SessionDescription) -> Result<()> {
        let Some(handle) = self.broadcaster.as_mut() else {
            warn!("Answer received with no broadcaster link, ignoring");
            return Ok(());
        };
        if handle.remote_applied {
            warn!("Current offer is already answered, ignoring extra answer");
            return Ok(());
        }

        handle.link.accept_answer(answer).await?;
        handle.remote_applied = true;
        info!("Answer applied on broadcaster link {:?}", handle.link.id());

        self.flush_pending(LinkRole::Broadcaster).await;
        Ok(())
    }

    /// Applies a remote candidate to the link of `role`, buffering it while
    /// that link is missing or has no remote description yet. Never fails.
    pub async fn add_remote_ice_candidate(&mut self, role: LinkRole, candidate: IceCandidate) {
        let ready = matches!(self.handle(role), Some(handle) if handle.remote_applied);

        if !ready {
            let pending = self.pending_candidates.entry(role).or_default();
            if pending.len() >= MAX_PENDING_CANDIDATES {
                warn!("Candidate buffer for {:?} is full, dropping oldest", role);
                pending.pop_front();
            }
            pending.push_back(candidate);
            debug!("Buffered remote candidate for {:?} ({})", role, pending.len());
            return;
        }

        if let Some(handle) = self.handle(role) {
            if let Err(e) = handle.link.add_ice_candidate(candidate).await {
                warn!("Failed to add ICE candidate on {:?}: {}", role, e);
            }
        }
    }

    /// Forwards a locally gathered candidate of a current link to the room.
    pub async fn send_local_candidate(&self, link: LinkId, candidate: IceCandidate) {
        if !self.is_current(link) {
            debug!("Dropping candidate from superseded link {:?}", link);
            return;
        }
        self.signaling
            .emit(RelayEvent::ObserverIceCandidate(CandidatePayload {
                candidate,
                room_id: self.room_id.clone(),
            }))
            .await;
    }

    pub fn is_current(&self, link: LinkId) -> bool {
        self.handle(link.role)
            .is_some_and(|handle| handle.link.id() == link)
    }

    /// Closes the link of `role` and forgets its buffered candidates. Idempotent.
    pub async fn teardown(&mut self, role: LinkRole) {
        self.close_link(role).await;
        self.pending_candidates.remove(&role);
    }

    pub async fn teardown_all(&mut self) {
        self.teardown(LinkRole::Broadcaster).await;
        self.teardown(LinkRole::Viewer).await;
    }

    async fn create_link(&mut self, role: LinkRole) -> Result<LinkId> {
        // Early candidates for the new negotiation stay buffered across the swap.
        self.close_link(role).await;

        self.generation += 1;
        let id = LinkId {
            role,
            generation: self.generation,
        };
        let link = self.factory.create(id, self.events_tx.clone()).await?;
        info!("Created peer link {:?}", id);

        let handle = LinkHandle {
            link,
            remote_applied: false,
            current_offer: None,
            answered_offer: None,
        };
        match role {
            LinkRole::Broadcaster => self.broadcaster = Some(handle),
            LinkRole::Viewer => self.viewer = Some(handle),
        }
        Ok(id)
    }

    async fn close_link(&mut self, role: LinkRole) {
        let handle = match role {
            LinkRole::Broadcaster => self.broadcaster.take(),
            LinkRole::Viewer => self.viewer.take(),
        };
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = handle.link.close().await {
            warn!("Closing peer link {:?} failed: {}", handle.link.id(), e);
        } else {
            debug!("Closed peer link {:?}", handle.link.id());
        }
    }

    async fn flush_pending(&mut self, role: LinkRole) {
        let Some(pending) = self.pending_candidates.remove(&role) else {
            return;
        };
        let Some(handle) = self.handle(role) else {
            return;
        };

        debug!("Applying {} buffered candidate(s) on {:?}", pending.len(), role);
        for candidate in pending {
            if let Err(e) = handle.link.add_ice_candidate(candidate).await {
                warn!("Buffered ICE candidate rejected on {:?}: {}", role, e);
            }
        }
    }

    async fn emit_offer(&self, offer: SessionDescription) {
        self.signaling
            .emit(RelayEvent::ObserverOffer(OfferPayload {
                offer,
                room_id: self.room_id.clone(),
            }))
            .await;
    }

    fn handle(&self, role: LinkRole) -> Option<&LinkHandle> {
        match role {
            LinkRole::Broadcaster => self.broadcaster.as_ref(),
            LinkRole::Viewer => self.viewer.as_ref(),
        }
    }
}

use crate::config::SessionConfig;
use crate::error::{Result, SignalingError};
use crate::media::{LocalStream, MediaCapture, RemoteStream};
use crate::negotiation::{BroadcastPhase, NegotiationThrottle, ViewerPhase};
use crate::peer::PeerConnectionManager;
use crate::session::observer_registry::ObserverRegistry;
use crate::session::role_plan::{join_events, subscriptions};
use crate::session::session_command::SessionCommand;
use crate::session::session_event::{Notice, NoticeLevel, SessionEvent, SessionState};
use crate::session::session_handle::SessionHandle;
use crate::signaling::{ListenerId, SignalingTransport, TransportStatus, WsTransport};
use crate::transport::{LinkId, LinkRole, PeerEvent, PeerFactory, PeerState, RtcPeerFactory};
use chrono::Utc;
use screenwatch_core::{
    EventName, ObserverDeparture, ObserverPresence, ObserverProfile, ObserverRecord, RelayEvent,
    Role, RoomId, RoomRef, ScreenRequest, SessionDescription,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Who is joining which room, and how.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub room_id: RoomId,
    pub role: Role,
    /// Identity an observer announces; a bare "observer" profile is used when absent.
    pub profile: Option<ObserverProfile>,
    pub config: SessionConfig,
}

impl SessionParams {
    pub fn new(room_id: impl Into<RoomId>, role: Role) -> Self {
        Self {
            room_id: room_id.into(),
            role,
            profile: None,
            config: SessionConfig::default(),
        }
    }

    pub fn with_profile(mut self, profile: ObserverProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartTrigger {
    User,
    Observer,
}

/// One user's participation in a room: the role coordinator and both
/// negotiation state machines, driven by a single event loop.
///
/// Everything that mutates the session (commands, relay events, peer callbacks,
/// capture completion, timers) is serialized through [`Session::run`].
pub struct Session {
    room_id: RoomId,
    role: Role,
    profile: Option<ObserverProfile>,
    config: SessionConfig,

    signaling: Arc<dyn SignalingTransport>,
    capture: Arc<dyn MediaCapture>,
    peers: PeerConnectionManager,
    throttle: NegotiationThrottle,
    observers: ObserverRegistry,

    broadcast: BroadcastPhase,
    viewer: ViewerPhase,
    transport_status: TransportStatus,
    status_closed: bool,

    identity: Option<ObserverRecord>,
    left: bool,
    local_stream: Option<LocalStream>,
    capture_ended: Option<watch::Receiver<bool>>,
    remote_stream: Option<RemoteStream>,

    pending_capture: Option<JoinHandle<Result<LocalStream>>>,
    start_deadline: Option<Instant>,
    pending_warm_joins: usize,
    offer_request_at: Option<Instant>,

    subscriptions: Vec<(EventName, ListenerId)>,
    relay_tx: mpsc::UnboundedSender<RelayEvent>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    status_rx: watch::Receiver<TransportStatus>,
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(
        params: SessionParams,
        signaling: Arc<dyn SignalingTransport>,
        factory: Arc<dyn PeerFactory>,
        capture: Arc<dyn MediaCapture>,
    ) -> (Self, SessionHandle) {
        let SessionParams {
            room_id,
            role,
            profile,
            config,
        } = params;

        let (command_tx, command_rx) = mpsc::channel(64);
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(256);

        let status_rx = signaling.status();
        let peers = PeerConnectionManager::new(room_id.clone(), signaling.clone(), factory, peer_tx);
        let throttle = NegotiationThrottle::new(config.throttle_window, config.max_start_attempts);

        let (state_tx, state_rx) = watch::channel(SessionState {
            room_id: room_id.clone(),
            role,
            transport: TransportStatus::Connecting,
            broadcast: BroadcastPhase::Idle,
            viewer: ViewerPhase::Idle,
            attempt_count: 0,
            start_in_flight: false,
            observers: Vec::new(),
            sharing_local_stream: false,
            receiving_remote_stream: false,
        });
        let handle = SessionHandle::new(command_tx, state_rx, events_tx.clone());

        let session = Self {
            room_id,
            role,
            profile,
            config,
            signaling,
            capture,
            peers,
            throttle,
            observers: ObserverRegistry::new(),
            broadcast: BroadcastPhase::Idle,
            viewer: ViewerPhase::Idle,
            transport_status: TransportStatus::Connecting,
            status_closed: false,
            identity: None,
            left: false,
            local_stream: None,
            capture_ended: None,
            remote_stream: None,
            pending_capture: None,
            start_deadline: None,
            pending_warm_joins: 0,
            offer_request_at: None,
            subscriptions: Vec::new(),
            relay_tx,
            relay_rx,
            peer_rx,
            command_rx,
            status_rx,
            state_tx,
            events_tx,
        };
        (session, handle)
    }

    /// A session talking to a websocket relay and building real WebRTC links.
    pub fn over_websocket(
        url: impl Into<String>,
        params: SessionParams,
        capture: Arc<dyn MediaCapture>,
    ) -> (Self, SessionHandle) {
        let transport = Arc::new(WsTransport::connect(url, params.config.signaling.clone()));
        let factory = Arc::new(RtcPeerFactory::new(params.config.transport.clone()));
        Self::new(params, transport, factory, capture)
    }

    pub async fn run(mut self) {
        info!("Session for room {} started as {}", self.room_id, self.role);

        self.subscribe();
        let status = *self.status_rx.borrow_and_update();
        self.on_transport_status(status).await;
        self.publish_state();

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => {
                            info!("Session for room {} shutting down", self.room_id);
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                    }
                }

                Some(event) = self.relay_rx.recv() => self.handle_relay_event(event).await,

                Some(event) = self.peer_rx.recv() => self.handle_peer_event(event).await,

                changed = self.status_rx.changed(), if !self.status_closed => {
                    match changed {
                        Ok(()) => {
                            let status = *self.status_rx.borrow_and_update();
                            self.on_transport_status(status).await;
                        }
                        Err(_) => {
                            warn!("Signaling transport dropped its status channel");
                            self.status_closed = true;
                            self.on_transport_status(TransportStatus::Disconnected).await;
                        }
                    }
                }

                result = poll_capture(&mut self.pending_capture), if self.pending_capture.is_some() => {
                    self.pending_capture = None;
                    self.on_capture_finished(result).await;
                }

                _ = sleep_until(self.start_deadline), if self.start_deadline.is_some() => {
                    self.on_start_timeout().await;
                }

                _ = sleep_until(self.offer_request_at), if self.offer_request_at.is_some() => {
                    self.offer_request_at = None;
                    self.emit_presence(RelayEvent::ObserverRequestOffer).await;
                }

                _ = wait_ended(&mut self.capture_ended), if self.capture_ended.is_some() => {
                    info!("Captured stream ended at the source");
                    self.capture_ended = None;
                    self.stop_broadcast(BroadcastPhase::StoppedByUser).await;
                }
            }

            self.publish_state();
        }

        self.close().await;
        info!("Session for room {} finished", self.room_id);
    }

    fn subscribe(&mut self) {
        for &name in subscriptions(self.role) {
            let id = self.signaling.on(name, self.relay_tx.clone());
            self.subscriptions.push((name, id));
        }
        debug!("Subscribed to {} relay event(s)", self.subscriptions.len());
    }

    async fn on_transport_status(&mut self, status: TransportStatus) {
        let previous = self.transport_status;
        self.transport_status = status;
        if previous == status {
            return;
        }

        match status {
            TransportStatus::Connected => self.announce().await,
            TransportStatus::Disconnected => {
                warn!("Relay channel for room {} is down", self.room_id);
                self.offer_request_at = None;
                if self.role == Role::Observer {
                    self.reset_viewer(Some((NoticeLevel::Error, "Lost connection to the relay")))
                        .await;
                }
            }
            TransportStatus::Connecting => debug!("Connecting to relay"),
        }
    }

    /// Join emission, repeated on every (re)connect.
    async fn announce(&mut self) {
        if self.left {
            debug!("Already left room {}, not rejoining", self.room_id);
            return;
        }

        if self.role == Role::Observer && self.identity.is_none() {
            let profile = self.profile.clone().unwrap_or_else(|| ObserverProfile {
                role: Role::Observer.as_str().to_owned(),
                ..Default::default()
            });
            self.identity = Some(profile.to_record(Utc::now()));
        }

        for event in join_events(self.role, &self.room_id, self.identity.as_ref()) {
            self.signaling.emit(event).await;
        }
        info!("Joined room {} as {}", self.room_id, self.role);

        if self.role == Role::Observer {
            self.offer_request_at = Some(Instant::now() + self.config.offer_request_delay);
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match (cmd, self.role) {
            (SessionCommand::StartBroadcast, Role::Admin) => {
                self.request_broadcast(StartTrigger::User).await
            }
            (SessionCommand::StopBroadcast, Role::Admin) | (SessionCommand::Leave, Role::Admin) => {
                self.stop_broadcast(BroadcastPhase::StoppedByUser).await
            }
            (SessionCommand::RequestScreen, Role::Observer) => {
                self.emit_presence(RelayEvent::ObserverRequestScreen).await
            }
            (SessionCommand::RequestOffer, Role::Observer) => {
                self.emit_presence(RelayEvent::ObserverRequestOffer).await
            }
            (SessionCommand::Leave, Role::Observer) => self.leave_room().await,
            (cmd, role) => warn!("{:?} is not available to {}", cmd, role),
        }
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        if let Some(room) = event.room_id() {
            if room != &self.room_id {
                debug!("Ignoring '{}' for room {}", event.name(), room);
                return;
            }
        }

        match event {
            RelayEvent::ObserverJoined(record) => {
                let name = record.observer_name.clone();
                if self.observers.insert(record) {
                    info!("Observer {} joined ({} in room)", name, self.observers.len());
                    self.publish(SessionEvent::ObserversChanged(self.observers.list()));
                } else {
                    debug!("Observer {} rejoined", name);
                }
                self.request_broadcast(StartTrigger::Observer).await;
            }

            RelayEvent::ObserverLeft(record) => {
                info!("Observer {} left", record.observer_name);
                if self.observers.remove(&record.observer_id).is_some() {
                    self.publish(SessionEvent::ObserversChanged(self.observers.list()));
                }
            }

            RelayEvent::ObserversUpdated(list) => {
                self.observers.replace_all(list);
                self.publish(SessionEvent::ObserversChanged(self.observers.list()));
            }

            RelayEvent::ObserverRequestedScreen(request)
            | RelayEvent::ObserverRequestedOffer(request) => {
                info!("Screen requested by {}", requester(&request));
                self.request_broadcast(StartTrigger::Observer).await;
            }

            RelayEvent::ObserverAnswer(payload) => {
                if let Err(e) = self.peers.accept_answer(payload.answer).await {
                    error!("Failed to apply observer answer: {}", e);
                    self.notify(NoticeLevel::Error, format!("Failed to connect observer: {e}"));
                }
            }

            RelayEvent::ObserverIceCandidate(payload) => {
                let role = match self.role {
                    Role::Admin => LinkRole::Broadcaster,
                    _ => LinkRole::Viewer,
                };
                self.peers
                    .add_remote_ice_candidate(role, payload.candidate)
                    .await;
            }

            RelayEvent::ObserverOffer(payload) => self.answer_offer(payload.offer).await,

            RelayEvent::ObserverScreenShareStopped(_) => {
                info!("Broadcaster stopped sharing");
                self.reset_viewer(Some((NoticeLevel::Info, "Screen sharing stopped")))
                    .await;
            }

            RelayEvent::ObserverScreenData(data) => {
                self.publish(SessionEvent::ScreenData(data.stream));
            }

            RelayEvent::ObserverPermissionsUpdated(permissions) => {
                self.publish(SessionEvent::PermissionsUpdated(permissions));
            }

            other => debug!("Ignoring relay event '{}'", other.name()),
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let link = event.link();
        if !self.peers.is_current(link) {
            debug!("Ignoring event from superseded link {:?}", link);
            return;
        }

        match event {
            PeerEvent::CandidateGenerated(link, candidate) => {
                self.peers.send_local_candidate(link, candidate).await;
            }

            PeerEvent::TrackReceived(_, track) => {
                let stream = self.remote_stream.get_or_insert_with(RemoteStream::new);
                stream.add_track(track);
                let stream = stream.clone();
                self.publish(SessionEvent::RemoteStream(Some(stream)));
            }

            PeerEvent::StateChanged(link, state) => self.on_link_state(link, state).await,
        }
    }

    async fn on_link_state(&mut self, link: LinkId, state: PeerState) {
        match (link.role, state) {
            (LinkRole::Broadcaster, PeerState::Failed)
                if self.broadcast == BroadcastPhase::Broadcasting =>
            {
                warn!("Broadcaster link {:?} failed", link);
                self.stop_broadcast(BroadcastPhase::StoppedByRemote).await;
            }
            (LinkRole::Viewer, PeerState::Failed) => {
                warn!("Viewer link {:?} failed", link);
                self.reset_viewer(Some((
                    NoticeLevel::Error,
                    "Lost connection to the shared screen",
                )))
                .await;
            }
            _ => debug!("Peer link {:?} is {:?}", link, state),
        }
    }

    async fn request_broadcast(&mut self, trigger: StartTrigger) {
        match self.broadcast {
            BroadcastPhase::Broadcasting => {
                if trigger == StartTrigger::User {
                    debug!("Already broadcasting");
                    return;
                }
                if let Err(e) = self.peers.resend_offer().await {
                    warn!("Warm join failed: {}", e);
                }
            }

            BroadcastPhase::Starting => {
                debug!("{} while starting", SignalingError::ThrottledDrop);
                if trigger == StartTrigger::Observer {
                    self.pending_warm_joins += 1;
                }
            }

            _ => {
                if self.transport_status != TransportStatus::Connected {
                    let e = SignalingError::TransportDisconnected;
                    warn!("Not starting broadcast: {}", e);
                    if trigger == StartTrigger::User {
                        self.notify(
                            NoticeLevel::Error,
                            format!("Failed to start screen sharing: {e}"),
                        );
                    }
                    return;
                }

                let now = Instant::now();
                if !self.throttle.should_allow(now) {
                    info!(
                        "{} ({} attempt(s) in window)",
                        SignalingError::ThrottledDrop,
                        self.throttle.attempt_count()
                    );
                    return;
                }
                self.begin_start(now);
            }
        }
    }

    fn begin_start(&mut self, now: Instant) {
        self.throttle.record_attempt(now);
        self.set_broadcast(BroadcastPhase::Starting);

        let capture = self.capture.clone();
        self.pending_capture = Some(tokio::spawn(async move { capture.capture().await }));
        self.start_deadline = Some(now + self.config.negotiation_timeout);
    }

    async fn on_capture_finished(&mut self, result: Result<LocalStream>) {
        let stream = match result {
            Ok(stream) => stream,
            Err(e) => return self.fail_start(e).await,
        };

        let timeout = self.config.negotiation_timeout;
        let deadline = self
            .start_deadline
            .unwrap_or_else(|| Instant::now() + timeout);

        match tokio::time::timeout_at(deadline, self.negotiate_broadcast(&stream)).await {
            Ok(Ok(())) => self.confirm_broadcast(stream).await,
            Ok(Err(e)) => {
                stream.end();
                self.fail_start(e).await;
            }
            Err(_) => {
                stream.end();
                self.fail_start(SignalingError::NegotiationTimedOut(timeout))
                    .await;
            }
        }
    }

    async fn negotiate_broadcast(&mut self, stream: &LocalStream) -> Result<()> {
        self.peers.create_broadcaster_connection().await?;
        self.peers.attach_local_stream(stream).await?;
        self.peers.create_offer().await?;
        Ok(())
    }

    async fn confirm_broadcast(&mut self, stream: LocalStream) {
        self.start_deadline = None;
        self.throttle.succeed();
        self.capture_ended = Some(stream.ended());
        self.local_stream = Some(stream);

        self.set_broadcast(BroadcastPhase::Broadcasting);
        self.notify(NoticeLevel::Success, "Screen sharing started");

        let warm_joins = std::mem::take(&mut self.pending_warm_joins);
        for _ in 0..warm_joins {
            if let Err(e) = self.peers.resend_offer().await {
                warn!("Warm join failed: {}", e);
            }
        }
    }

    async fn on_start_timeout(&mut self) {
        let timeout = self.config.negotiation_timeout;
        warn!("Screen sharing did not start within {:?}", timeout);
        self.abort_capture();
        self.fail_start(SignalingError::NegotiationTimedOut(timeout))
            .await;
    }

    async fn fail_start(&mut self, e: SignalingError) {
        self.start_deadline = None;
        self.abort_capture();
        self.throttle.release();
        self.pending_warm_joins = 0;
        self.peers.teardown(LinkRole::Broadcaster).await;

        error!("Failed to start screen sharing: {}", e);
        self.set_broadcast(BroadcastPhase::Failed);
        self.notify(
            NoticeLevel::Error,
            format!("Failed to start screen sharing: {e}"),
        );
        self.set_broadcast(BroadcastPhase::Idle);
    }

    /// Stops or cancels the broadcast; a no-op when nothing is active.
    async fn stop_broadcast(&mut self, reason: BroadcastPhase) {
        match self.broadcast {
            BroadcastPhase::Starting => {
                info!("Cancelling screen sharing start");
                self.abort_capture();
                self.start_deadline = None;
                self.throttle.release();
                self.pending_warm_joins = 0;
                self.peers.teardown(LinkRole::Broadcaster).await;
            }

            BroadcastPhase::Broadcasting => {
                self.peers.teardown(LinkRole::Broadcaster).await;
                if let Some(stream) = self.local_stream.take() {
                    stream.end();
                }
                self.capture_ended = None;

                self.signaling
                    .emit(RelayEvent::ObserverScreenShareStopped(RoomRef {
                        room_id: self.room_id.clone(),
                    }))
                    .await;
                self.notify(NoticeLevel::Info, "Screen sharing stopped");
            }

            _ => {
                debug!("Nothing to stop");
                return;
            }
        }

        self.set_broadcast(reason);
        self.set_broadcast(BroadcastPhase::Idle);
    }

    async fn answer_offer(&mut self, offer: SessionDescription) {
        if self.peers.is_answering(&offer) {
            debug!("Already answering this offer");
            return;
        }

        if self.remote_stream.take().is_some() {
            self.publish(SessionEvent::RemoteStream(None));
        }
        self.set_viewer(ViewerPhase::Connecting);

        let timeout = self.config.negotiation_timeout;
        let peers = &mut self.peers;
        let outcome = tokio::time::timeout(timeout, async move {
            match peers.create_viewer_connection().await {
                Ok(_) => peers.accept_offer(offer).await,
                Err(e) => Err(e),
            }
        })
        .await;

        match outcome {
            Ok(Ok(_)) => {
                self.set_viewer(ViewerPhase::Connected);
                self.notify(NoticeLevel::Success, "Connected to the shared screen");
            }
            Ok(Err(e)) => self.fail_viewer(e).await,
            Err(_) => self
                .fail_viewer(SignalingError::NegotiationTimedOut(timeout))
                .await,
        }
    }

    async fn fail_viewer(&mut self, e: SignalingError) {
        error!("Failed to answer offer: {}", e);
        self.peers.teardown(LinkRole::Viewer).await;
        self.set_viewer(ViewerPhase::Idle);
        self.notify(
            NoticeLevel::Error,
            format!("Failed to join screen share: {e}"),
        );
    }

    async fn reset_viewer(&mut self, notice: Option<(NoticeLevel, &str)>) {
        self.peers.teardown(LinkRole::Viewer).await;
        if self.remote_stream.take().is_some() {
            self.publish(SessionEvent::RemoteStream(None));
        }
        if self.viewer == ViewerPhase::Idle {
            return;
        }

        self.set_viewer(ViewerPhase::Idle);
        if let Some((level, message)) = notice {
            self.notify(level, message);
        }
    }

    async fn leave_room(&mut self) {
        self.offer_request_at = None;
        self.reset_viewer(None).await;

        let Some(observer) = self.identity.take() else {
            debug!("Not announced in room {}, nothing to leave", self.room_id);
            return;
        };
        self.left = true;
        self.signaling
            .emit(RelayEvent::ObserverLeaveRoom(ObserverDeparture {
                room_id: self.room_id.clone(),
                observer,
                left_at: Utc::now(),
            }))
            .await;
        info!("Left room {}", self.room_id);
    }

    async fn emit_presence(&self, event: fn(ObserverPresence) -> RelayEvent) {
        let Some(observer) = self.identity.clone() else {
            warn!("Observer identity not announced yet, request dropped");
            return;
        };
        self.signaling
            .emit(event(ObserverPresence {
                room_id: self.room_id.clone(),
                observer,
            }))
            .await;
    }

    async fn close(&mut self) {
        match self.role {
            Role::Observer => self.leave_room().await,
            Role::Admin => self.stop_broadcast(BroadcastPhase::StoppedByUser).await,
            Role::Participant => {}
        }
        self.peers.teardown_all().await;

        for (name, id) in self.subscriptions.drain(..) {
            self.signaling.off(name, id);
        }
        self.publish_state();
    }

    fn abort_capture(&mut self) {
        if let Some(task) = self.pending_capture.take() {
            task.abort();
        }
    }

    fn set_broadcast(&mut self, phase: BroadcastPhase) {
        if self.broadcast == phase {
            return;
        }
        info!("Broadcast {:?} -> {:?}", self.broadcast, phase);
        self.broadcast = phase;
        self.publish(SessionEvent::BroadcastPhase(phase));
    }

    fn set_viewer(&mut self, phase: ViewerPhase) {
        if self.viewer == phase {
            return;
        }
        info!("Viewer {:?} -> {:?}", self.viewer, phase);
        self.viewer = phase;
        self.publish(SessionEvent::ViewerPhase(phase));
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.publish(SessionEvent::Notice(Notice {
            level,
            message: message.into(),
        }));
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn publish_state(&self) {
        let next = SessionState {
            room_id: self.room_id.clone(),
            role: self.role,
            transport: self.transport_status,
            broadcast: self.broadcast,
            viewer: self.viewer,
            attempt_count: self.throttle.attempt_count(),
            start_in_flight: self.throttle.in_flight(),
            observers: self.observers.list(),
            sharing_local_stream: self.local_stream.is_some(),
            receiving_remote_stream: self.remote_stream.as_ref().is_some_and(|s| !s.is_empty()),
        };
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

fn requester(request: &ScreenRequest) -> &str {
    request
        .observer
        .as_ref()
        .map_or("an observer", |o| o.observer_name.as_str())
}

async fn poll_capture(task: &mut Option<JoinHandle<Result<LocalStream>>>) -> Result<LocalStream> {
    match task {
        Some(task) => match task.await {
            Ok(result) => result,
            Err(e) => Err(SignalingError::CaptureFailed(e.to_string())),
        },
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_ended(ended: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = ended else {
        return std::future::pending().await;
    };
    let fired = rx.wait_for(|ended| *ended).await.is_ok();
    if !fired {
        // Sender gone without ending; nothing more will happen on this stream.
        std::future::pending::<()>().await;
    }
}

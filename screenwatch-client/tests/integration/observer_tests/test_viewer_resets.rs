use screenwatch_client::transport::{LinkRole, PeerState};
use screenwatch_client::{
    ConnectionState, NoticeLevel, SessionEvent, SignalingTransport, TransportStatus, ViewerPhase,
};
use screenwatch_core::{EventName, OfferPayload, RelayEvent, RoomRef, SessionDescription};
use screenwatch_relay::RelayHub;

use crate::integration::{
    TestSession, WAIT, create_observer, init_tracing, next_event, raw_admin, room, settle,
};
use crate::utils::HubTransport;

async fn connect_viewer(admin: &HubTransport, observer: &TestSession, sdp: &str) {
    admin
        .emit(RelayEvent::ObserverOffer(OfferPayload {
            offer: SessionDescription::offer(sdp),
            room_id: room(),
        }))
        .await;
    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never answered");
}

#[tokio::test(start_paused = true)]
async fn test_remote_stop_resets_viewer() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "20");
    settle().await;
    connect_viewer(&admin, &observer, "remote-offer-1").await;
    let mut events = observer.handle.subscribe();

    admin
        .emit(RelayEvent::ObserverScreenShareStopped(RoomRef { room_id: room() }))
        .await;

    assert!(
        next_event(&mut events, |e| matches!(
            e,
            SessionEvent::ViewerPhase(ViewerPhase::Idle)
        ))
        .await
        .is_some()
    );
    let closed = observer.peers.closed().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].role, LinkRole::Viewer);

    // The same offer again is a new session now that the old link is gone.
    connect_viewer(&admin, &observer, "remote-offer-1").await;
    assert_eq!(observer.peers.answers_created(), 2);

    observer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_viewer_link_reports_error() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "21");
    settle().await;
    connect_viewer(&admin, &observer, "remote-offer-1").await;
    let mut events = observer.handle.subscribe();

    observer
        .peers
        .report_state(LinkRole::Viewer, PeerState::Failed)
        .await;

    let Some(SessionEvent::Notice(notice)) =
        next_event(&mut events, |e| matches!(e, SessionEvent::Notice(_))).await
    else {
        panic!("no notice for the failed link");
    };
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(observer.handle.state().viewer, ViewerPhase::Idle);

    observer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_relay_loss_resets_viewer_and_rejoins() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "22");
    settle().await;
    connect_viewer(&admin, &observer, "remote-offer-1").await;

    observer.transport.set_status(TransportStatus::Disconnected);
    let state = observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Idle, WAIT)
        .await
        .expect("viewer survived the relay outage");
    assert_eq!(state.connection_state(), ConnectionState::Disconnected);
    assert!(hub.observers(&room()).is_empty());

    observer.transport.set_status(TransportStatus::Connected);
    observer
        .handle
        .wait_for(|s| s.transport == TransportStatus::Connected, WAIT)
        .await
        .expect("session never saw the relay come back");
    settle().await;

    assert_eq!(
        observer
            .transport
            .count_sent(EventName::ObserverJoinRoom)
            .await,
        2
    );
    assert_eq!(hub.observers(&room()).len(), 1);

    observer.shutdown().await;
}

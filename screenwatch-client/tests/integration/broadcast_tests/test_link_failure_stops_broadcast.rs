use std::time::Duration;

use screenwatch_client::transport::{LinkRole, PeerState};
use screenwatch_client::{BroadcastPhase, SessionEvent, ViewerPhase};
use screenwatch_relay::RelayHub;

use crate::integration::{WAIT, create_admin, create_observer, init_tracing, next_event, settle};
use crate::utils::CaptureMode;

#[tokio::test(start_paused = true)]
async fn test_link_failure_stops_broadcast() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = create_admin(&hub, CaptureMode::Immediate);
    settle().await;
    let observer = create_observer(&hub, "3");

    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never connected");
    tokio::time::sleep(Duration::from_secs(2)).await;
    let mut events = admin.handle.subscribe();

    admin
        .peers
        .report_state(LinkRole::Broadcaster, PeerState::Failed)
        .await;

    assert!(
        next_event(&mut events, |e| matches!(
            e,
            SessionEvent::BroadcastPhase(BroadcastPhase::StoppedByRemote)
        ))
        .await
        .is_some()
    );
    admin
        .handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Idle, WAIT)
        .await
        .expect("admin did not settle to idle");
    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Idle, WAIT)
        .await
        .expect("observer was not told the share stopped");

    observer.shutdown().await;
    admin.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_states_from_superseded_links_are_ignored() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = create_admin(&hub, CaptureMode::Immediate);
    settle().await;

    admin.handle.start_broadcast().await.unwrap();
    admin
        .handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Broadcasting, WAIT)
        .await
        .expect("first broadcast never started");
    admin.handle.stop_broadcast().await.unwrap();
    admin
        .handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Idle, WAIT)
        .await
        .expect("stop did not settle");

    // Wait out the start throttle.
    tokio::time::sleep(Duration::from_secs(6)).await;
    admin.handle.start_broadcast().await.unwrap();
    admin
        .handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Broadcasting, WAIT)
        .await
        .expect("second broadcast never started");

    let links = admin.peers.created(LinkRole::Broadcaster).await;
    assert_eq!(links.len(), 2);
    assert!(links[1].generation > links[0].generation);

    admin.peers.report_state_on(links[0], PeerState::Failed).await;
    settle().await;
    assert_eq!(admin.handle.state().broadcast, BroadcastPhase::Broadcasting);

    admin.shutdown().await;
}

use screenwatch_client::transport::LinkRole;
use chrono::Utc;
use screenwatch_client::{BroadcastPhase, SessionEvent, ViewerPhase};
use screenwatch_core::RelayEvent;
use screenwatch_relay::RelayHub;

use crate::integration::{
    WAIT, create_admin, create_observer, drain_events, init_tracing, profile, settle,
};
use crate::utils::CaptureMode;

#[tokio::test(start_paused = true)]
async fn test_concurrent_joins_start_once() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = create_admin(&hub, CaptureMode::Pending);
    settle().await;

    let observers: Vec<_> = (0..5)
        .map(|i| create_observer(&hub, &format!("obs-{i}")))
        .collect();

    let state = admin
        .handle
        .wait_for(|s| s.observers.len() == 5, WAIT)
        .await
        .expect("admin did not see every observer");
    assert_eq!(state.broadcast, BroadcastPhase::Starting);
    assert_eq!(admin.capture.calls(), 1);

    admin.capture.release();
    admin
        .handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Broadcasting, WAIT)
        .await
        .expect("broadcast never started");

    for observer in &observers {
        observer
            .handle
            .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
            .await
            .expect("an observer never connected");
        assert_eq!(observer.peers.answers_created(), 1);
    }

    assert_eq!(admin.capture.calls(), 1);
    assert_eq!(admin.peers.offers_created(), 1);
    assert_eq!(admin.peers.created(LinkRole::Broadcaster).await.len(), 1);

    for observer in observers {
        observer.shutdown().await;
    }
    admin.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejoining_observer_is_refreshed_quietly() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = create_admin(&hub, CaptureMode::Pending);
    settle().await;
    let mut events = admin.handle.subscribe();

    let first = profile("7").to_record(Utc::now());
    let mut again = profile("7");
    again.last_name = Some("Seven".into());

    admin.transport.inject(RelayEvent::ObserverJoined(first));
    settle().await;
    admin
        .transport
        .inject(RelayEvent::ObserverJoined(again.to_record(Utc::now())));
    settle().await;

    let changes = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::ObserversChanged(_)))
        .count();
    assert_eq!(changes, 1, "a refresh was published as a roster change");

    let state = admin.handle.state();
    assert_eq!(state.observers.len(), 1);
    assert_eq!(state.observers[0].observer_name, again.display_name());
    assert_eq!(state.broadcast, BroadcastPhase::Starting);
    assert_eq!(admin.capture.calls(), 1);

    admin.capture.release();
    admin.shutdown().await;
}

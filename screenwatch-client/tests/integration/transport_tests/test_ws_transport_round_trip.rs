use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use screenwatch_client::{
    BroadcastPhase, Session, SessionParams, SignalingOptions, SignalingTransport, TransportStatus,
    ViewerPhase, WsTransport,
};
use screenwatch_core::{EventName, ObserverPresence, RelayEvent, Role};
use screenwatch_relay::{RelayHub, router};
use tokio::net::TcpListener;

use crate::integration::{ROOM, init_tracing, profile, room};
use crate::utils::{CaptureMode, FakePeerFactory, MockCapture};

const REAL_WAIT: Duration = Duration::from_secs(10);

async fn spawn_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay");
    let addr = listener.local_addr().expect("relay has no address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(RelayHub::new())).await;
    });
    addr
}

async fn wait_connected(transport: &WsTransport) {
    let mut status = transport.status();
    tokio::time::timeout(
        REAL_WAIT,
        status.wait_for(|s| *s == TransportStatus::Connected),
    )
    .await
    .expect("relay connect timed out")
    .expect("transport driver gone");
}

#[tokio::test]
async fn test_events_cross_the_websocket_relay() {
    init_tracing();

    let addr = spawn_relay().await;
    let url = format!("ws://{addr}/ws");

    let admin = WsTransport::connect(url.clone(), SignalingOptions::default());
    let observer = WsTransport::connect(url, SignalingOptions::default());
    wait_connected(&admin).await;
    wait_connected(&observer).await;

    let (tx, mut joined) = tokio::sync::mpsc::unbounded_channel();
    admin.on(EventName::ObserverJoined, tx);
    admin.emit(RelayEvent::JoinAdminRoom(room())).await;
    admin.emit(RelayEvent::JoinObserverRoom(room())).await;

    // Give the relay a moment to register the admin before the observer shows up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let identity = profile("77").to_record(chrono::Utc::now());
    observer.emit(RelayEvent::JoinObserverRoom(room())).await;
    observer
        .emit(RelayEvent::ObserverJoinRoom(ObserverPresence {
            room_id: room(),
            observer: identity.clone(),
        }))
        .await;

    let event = tokio::time::timeout(REAL_WAIT, joined.recv())
        .await
        .expect("observer-joined never arrived")
        .expect("listener closed");
    assert_eq!(event, RelayEvent::ObserverJoined(identity));
}

#[tokio::test]
async fn test_unreachable_relay_reports_disconnected() {
    init_tracing();

    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        listener.local_addr().expect("addr")
    };
    let options = SignalingOptions {
        reconnection_attempts: 2,
        connect_timeout: Duration::from_millis(500),
        reconnection_delay: Duration::from_millis(50),
    };

    let transport = WsTransport::connect(format!("ws://{addr}/ws"), options);
    let mut status = transport.status();
    tokio::time::timeout(
        REAL_WAIT,
        status.wait_for(|s| *s == TransportStatus::Disconnected),
    )
    .await
    .expect("transport kept retrying")
    .expect("transport driver gone");

    // Emitting while offline is a logged no-op.
    transport.emit(RelayEvent::JoinRoom(room())).await;
}

#[tokio::test]
async fn test_sessions_negotiate_over_the_websocket_relay() {
    init_tracing();

    let addr = spawn_relay().await;
    let url = format!("ws://{addr}/ws");

    let admin_capture = MockCapture::new(CaptureMode::Immediate);
    let (admin, admin_handle) = Session::new(
        SessionParams::new(ROOM, Role::Admin),
        Arc::new(WsTransport::connect(url.clone(), SignalingOptions::default())),
        Arc::new(FakePeerFactory::new()),
        Arc::new(admin_capture.clone()),
    );
    tokio::spawn(admin.run());
    admin_handle
        .wait_for(|s| s.transport == TransportStatus::Connected, REAL_WAIT)
        .await
        .expect("admin never reached the relay");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (observer, observer_handle) = Session::new(
        SessionParams::new(ROOM, Role::Observer).with_profile(profile("78")),
        Arc::new(WsTransport::connect(url, SignalingOptions::default())),
        Arc::new(FakePeerFactory::new()),
        Arc::new(MockCapture::new(CaptureMode::Deny)),
    );
    tokio::spawn(observer.run());

    admin_handle
        .wait_for(|s| s.broadcast == BroadcastPhase::Broadcasting, REAL_WAIT)
        .await
        .expect("admin never started broadcasting");
    observer_handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, REAL_WAIT)
        .await
        .expect("observer never connected");
    assert_eq!(admin_capture.calls(), 1);

    admin_handle.stop_broadcast().await.unwrap();
    observer_handle
        .wait_for(|s| s.viewer == ViewerPhase::Idle, REAL_WAIT)
        .await
        .expect("stop never reached the observer");

    observer_handle.shutdown().await.unwrap();
    admin_handle.shutdown().await.unwrap();
}

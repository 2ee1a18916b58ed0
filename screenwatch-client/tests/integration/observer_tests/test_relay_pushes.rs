use screenwatch_client::{SessionEvent, SignalingTransport};
use screenwatch_core::{RelayEvent, ScreenData};
use screenwatch_relay::RelayHub;
use serde_json::json;

use crate::integration::{create_observer, init_tracing, next_event, raw_admin, room, settle};

#[tokio::test(start_paused = true)]
async fn test_permission_updates_reach_observers() {
    init_tracing();

    let hub = RelayHub::new();
    let observer = create_observer(&hub, "11");
    settle().await;
    let mut events = observer.handle.subscribe();

    hub.publish_permissions(&room(), json!({ "canViewScreen": true }));

    let Some(SessionEvent::PermissionsUpdated(permissions)) = next_event(&mut events, |e| {
        matches!(e, SessionEvent::PermissionsUpdated(_))
    })
    .await
    else {
        panic!("permissions never arrived");
    };
    assert_eq!(permissions["canViewScreen"], true);

    observer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_legacy_screen_data_is_passed_through() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "12");
    settle().await;
    let mut events = observer.handle.subscribe();

    admin
        .emit(RelayEvent::ObserverScreenData(ScreenData {
            stream: json!({ "id": "legacy-stream" }),
        }))
        .await;

    let Some(SessionEvent::ScreenData(stream)) =
        next_event(&mut events, |e| matches!(e, SessionEvent::ScreenData(_))).await
    else {
        panic!("screen data never arrived");
    };
    assert_eq!(stream["id"], "legacy-stream");

    observer.shutdown().await;
}

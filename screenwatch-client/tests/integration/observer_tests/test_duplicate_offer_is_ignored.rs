use screenwatch_client::transport::LinkRole;
use screenwatch_client::{SignalingTransport, ViewerPhase};
use screenwatch_core::{OfferPayload, RelayEvent, SessionDescription};
use screenwatch_relay::RelayHub;

use crate::integration::{WAIT, create_observer, init_tracing, raw_admin, room, settle};

fn offer(sdp: &str) -> RelayEvent {
    RelayEvent::ObserverOffer(OfferPayload {
        offer: SessionDescription::offer(sdp),
        room_id: room(),
    })
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_offer_is_ignored() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "4");
    settle().await;

    admin.emit(offer("remote-offer-a")).await;
    admin.emit(offer("remote-offer-a")).await;
    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never answered");
    settle().await;

    assert_eq!(observer.peers.answers_created(), 1);
    assert_eq!(observer.peers.created(LinkRole::Viewer).await.len(), 1);

    // A different offer is a renegotiation: fresh link, old one closed.
    admin.emit(offer("remote-offer-b")).await;
    settle().await;

    let links = observer.peers.created(LinkRole::Viewer).await;
    assert_eq!(links.len(), 2);
    assert_eq!(observer.peers.answers_created(), 2);
    assert_eq!(observer.peers.closed().await, vec![links[0]]);
    assert_eq!(observer.handle.state().viewer, ViewerPhase::Connected);

    observer.shutdown().await;
}

use screenwatch_client::peer::MAX_PENDING_CANDIDATES;
use screenwatch_client::transport::LinkRole;
use screenwatch_client::{SignalingTransport, ViewerPhase};
use screenwatch_core::{
    CandidatePayload, EventName, OfferPayload, RelayEvent, SessionDescription,
};
use screenwatch_relay::RelayHub;

use crate::integration::{
    WAIT, candidate, create_observer, init_tracing, raw_admin, room, settle,
};

#[tokio::test(start_paused = true)]
async fn test_early_ice_is_buffered_until_the_offer() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let mut answers = admin.listen(EventName::ObserverAnswer);
    let observer = create_observer(&hub, "8");
    settle().await;

    for n in 1..=2 {
        admin
            .emit(RelayEvent::ObserverIceCandidate(CandidatePayload {
                candidate: candidate(n),
                room_id: room(),
            }))
            .await;
    }
    settle().await;

    assert!(observer.peers.created(LinkRole::Viewer).await.is_empty());
    assert_eq!(observer.handle.state().viewer, ViewerPhase::Idle);

    admin
        .emit(RelayEvent::ObserverOffer(OfferPayload {
            offer: SessionDescription::offer("remote-offer-1"),
            room_id: room(),
        }))
        .await;

    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never answered");

    let applied = observer.peers.applied_candidates(LinkRole::Viewer).await;
    assert_eq!(applied, vec![candidate(1), candidate(2)]);

    let answer = tokio::time::timeout(WAIT, answers.recv())
        .await
        .expect("no answer relayed")
        .expect("listener closed");
    let RelayEvent::ObserverAnswer(payload) = answer else {
        panic!("unexpected event {answer:?}");
    };
    assert_eq!(payload.answer, SessionDescription::answer("fake-answer-1"));
    assert_eq!(payload.room_id, room());

    observer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_candidates_for_other_rooms_are_ignored() {
    init_tracing();

    let hub = RelayHub::new();
    let observer = create_observer(&hub, "8");
    settle().await;

    observer
        .transport
        .inject(RelayEvent::ObserverIceCandidate(CandidatePayload {
            candidate: candidate(9),
            room_id: "another-room".into(),
        }));
    observer
        .transport
        .inject(RelayEvent::ObserverOffer(OfferPayload {
            offer: SessionDescription::offer("remote-offer-1"),
            room_id: room(),
        }));

    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never answered");
    assert!(
        observer
            .peers
            .applied_candidates(LinkRole::Viewer)
            .await
            .is_empty()
    );

    observer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_full_candidate_buffer_drops_the_oldest() {
    init_tracing();

    let hub = RelayHub::new();
    let admin = raw_admin(&hub).await;
    let observer = create_observer(&hub, "10");
    settle().await;

    let total = MAX_PENDING_CANDIDATES as u32 + 2;
    for n in 1..=total {
        admin
            .emit(RelayEvent::ObserverIceCandidate(CandidatePayload {
                candidate: candidate(n),
                room_id: room(),
            }))
            .await;
    }
    settle().await;

    admin
        .emit(RelayEvent::ObserverOffer(OfferPayload {
            offer: SessionDescription::offer("remote-offer-1"),
            room_id: room(),
        }))
        .await;
    observer
        .handle
        .wait_for(|s| s.viewer == ViewerPhase::Connected, WAIT)
        .await
        .expect("observer never answered");

    let applied = observer.peers.applied_candidates(LinkRole::Viewer).await;
    let expected: Vec<_> = (3..=total).map(candidate).collect();
    assert_eq!(applied, expected);

    observer.shutdown().await;
}

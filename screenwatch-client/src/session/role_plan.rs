use screenwatch_core::{EventName, ObserverPresence, ObserverRecord, RelayEvent, Role, RoomId};

const ADMIN_EVENTS: &[EventName] = &[
    EventName::ObserverJoined,
    EventName::ObserverLeft,
    EventName::ObserverRequestedScreen,
    EventName::ObserverRequestedOffer,
    EventName::ObserverAnswer,
    EventName::ObserverIceCandidate,
    EventName::ObserversUpdated,
];

const OBSERVER_EVENTS: &[EventName] = &[
    EventName::ObserverOffer,
    EventName::ObserverIceCandidate,
    EventName::ObserverScreenShareStopped,
    EventName::ObserverScreenData,
    EventName::ObserverPermissionsUpdated,
];

/// Relay events a role listens to. Participants stay out of the observer protocol.
pub fn subscriptions(role: Role) -> &'static [EventName] {
    match role {
        Role::Admin => ADMIN_EVENTS,
        Role::Observer => OBSERVER_EVENTS,
        Role::Participant => &[],
    }
}

/// Events emitted, in order, every time the relay channel comes up.
///
/// An admin joins both channels: it must hear observer announcements while
/// staying discoverable as the broadcaster. An observer announces `identity`.
pub fn join_events(
    role: Role,
    room_id: &RoomId,
    identity: Option<&ObserverRecord>,
) -> Vec<RelayEvent> {
    match role {
        Role::Observer => {
            let mut events = vec![RelayEvent::JoinObserverRoom(room_id.clone())];
            if let Some(observer) = identity {
                events.push(RelayEvent::ObserverJoinRoom(ObserverPresence {
                    room_id: room_id.clone(),
                    observer: observer.clone(),
                }));
            }
            events
        }
        Role::Admin => vec![
            RelayEvent::JoinAdminRoom(room_id.clone()),
            RelayEvent::JoinObserverRoom(room_id.clone()),
        ],
        Role::Participant => vec![RelayEvent::JoinRoom(room_id.clone())],
    }
}

mod event;
mod observer;
mod role;
mod room;
mod signaling;

pub use event::{
    AnswerPayload, CandidatePayload, EventName, ObserverDeparture, ObserverPresence,
    OfferPayload, RelayEvent, RoomRef, ScreenData, ScreenRequest,
};
pub use observer::{ObserverProfile, ObserverRecord};
pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};

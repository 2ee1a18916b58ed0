use crate::model::observer::ObserverRecord;
use crate::model::room::RoomId;
use crate::model::signaling::{IceCandidate, SessionDescription};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An observer announcing itself (or asking for the screen) in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverPresence {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub observer: ObserverRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverDeparture {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub observer: ObserverRecord,
    pub left_at: DateTime<Utc>,
}

/// Relayed screen/offer request. The relay may strip either part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRequest {
    #[serde(rename = "roomId", default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(flatten)]
    pub observer: Option<ObserverRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPayload {
    pub offer: SessionDescription,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: SessionDescription,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub candidate: IceCandidate,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRef {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

/// Legacy delivery path: the stream descriptor is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenData {
    pub stream: serde_json::Value,
}

/// Every named event carried by the relay, in both directions.
///
/// Encoded as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayEvent {
    JoinRoom(RoomId),
    JoinAdminRoom(RoomId),
    JoinObserverRoom(RoomId),
    ObserverJoinRoom(ObserverPresence),
    ObserverLeaveRoom(ObserverDeparture),
    ObserverJoined(ObserverRecord),
    ObserverLeft(ObserverRecord),
    ObserverRequestScreen(ObserverPresence),
    ObserverRequestOffer(ObserverPresence),
    ObserverRequestedScreen(ScreenRequest),
    ObserverRequestedOffer(ScreenRequest),
    ObserverOffer(OfferPayload),
    ObserverAnswer(AnswerPayload),
    ObserverIceCandidate(CandidatePayload),
    ObserverScreenShareStopped(RoomRef),
    ObserverScreenData(ScreenData),
    ObserverPermissionsUpdated(serde_json::Value),
    ObserversUpdated(Vec<ObserverRecord>),
}

impl RelayEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::JoinRoom(_) => EventName::JoinRoom,
            Self::JoinAdminRoom(_) => EventName::JoinAdminRoom,
            Self::JoinObserverRoom(_) => EventName::JoinObserverRoom,
            Self::ObserverJoinRoom(_) => EventName::ObserverJoinRoom,
            Self::ObserverLeaveRoom(_) => EventName::ObserverLeaveRoom,
            Self::ObserverJoined(_) => EventName::ObserverJoined,
            Self::ObserverLeft(_) => EventName::ObserverLeft,
            Self::ObserverRequestScreen(_) => EventName::ObserverRequestScreen,
            Self::ObserverRequestOffer(_) => EventName::ObserverRequestOffer,
            Self::ObserverRequestedScreen(_) => EventName::ObserverRequestedScreen,
            Self::ObserverRequestedOffer(_) => EventName::ObserverRequestedOffer,
            Self::ObserverOffer(_) => EventName::ObserverOffer,
            Self::ObserverAnswer(_) => EventName::ObserverAnswer,
            Self::ObserverIceCandidate(_) => EventName::ObserverIceCandidate,
            Self::ObserverScreenShareStopped(_) => EventName::ObserverScreenShareStopped,
            Self::ObserverScreenData(_) => EventName::ObserverScreenData,
            Self::ObserverPermissionsUpdated(_) => EventName::ObserverPermissionsUpdated,
            Self::ObserversUpdated(_) => EventName::ObserversUpdated,
        }
    }

    /// Room the event is scoped to, when the payload carries one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom(room) | Self::JoinAdminRoom(room) | Self::JoinObserverRoom(room) => {
                Some(room)
            }
            Self::ObserverJoinRoom(p)
            | Self::ObserverRequestScreen(p)
            | Self::ObserverRequestOffer(p) => Some(&p.room_id),
            Self::ObserverLeaveRoom(d) => Some(&d.room_id),
            Self::ObserverRequestedScreen(r) | Self::ObserverRequestedOffer(r) => {
                r.room_id.as_ref()
            }
            Self::ObserverOffer(p) => Some(&p.room_id),
            Self::ObserverAnswer(p) => Some(&p.room_id),
            Self::ObserverIceCandidate(p) => Some(&p.room_id),
            Self::ObserverScreenShareStopped(r) => Some(&r.room_id),
            Self::ObserverJoined(_)
            | Self::ObserverLeft(_)
            | Self::ObserverScreenData(_)
            | Self::ObserverPermissionsUpdated(_)
            | Self::ObserversUpdated(_) => None,
        }
    }
}

/// Event names as they appear on the wire; the key for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    JoinRoom,
    JoinAdminRoom,
    JoinObserverRoom,
    ObserverJoinRoom,
    ObserverLeaveRoom,
    ObserverJoined,
    ObserverLeft,
    ObserverRequestScreen,
    ObserverRequestOffer,
    ObserverRequestedScreen,
    ObserverRequestedOffer,
    ObserverOffer,
    ObserverAnswer,
    ObserverIceCandidate,
    ObserverScreenShareStopped,
    ObserverScreenData,
    ObserverPermissionsUpdated,
    ObserversUpdated,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinRoom => "join-room",
            Self::JoinAdminRoom => "join-admin-room",
            Self::JoinObserverRoom => "join-observer-room",
            Self::ObserverJoinRoom => "observer-join-room",
            Self::ObserverLeaveRoom => "observer-leave-room",
            Self::ObserverJoined => "observer-joined",
            Self::ObserverLeft => "observer-left",
            Self::ObserverRequestScreen => "observer-request-screen",
            Self::ObserverRequestOffer => "observer-request-offer",
            Self::ObserverRequestedScreen => "observer-requested-screen",
            Self::ObserverRequestedOffer => "observer-requested-offer",
            Self::ObserverOffer => "observer-offer",
            Self::ObserverAnswer => "observer-answer",
            Self::ObserverIceCandidate => "observer-ice-candidate",
            Self::ObserverScreenShareStopped => "observer-screen-share-stopped",
            Self::ObserverScreenData => "observer-screen-data",
            Self::ObserverPermissionsUpdated => "observer-permissions-updated",
            Self::ObserversUpdated => "observers-updated",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

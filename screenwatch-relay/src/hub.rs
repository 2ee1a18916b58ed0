use dashmap::DashMap;
use screenwatch_core::{ObserverPresence, ObserverRecord, RelayEvent, RoomId, ScreenRequest};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// The three broadcast groups a room is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Room,
    Admin,
    Observer,
}

#[derive(Default)]
struct HubInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<RelayEvent>>,
    members: DashMap<(RoomId, Channel), HashSet<ConnectionId>>,
    observers: DashMap<RoomId, Vec<(ConnectionId, ObserverRecord)>>,
}

/// Room-scoped event router behind the `/ws` endpoint.
///
/// Admins (members of a room's admin channel) talk to the observer channel,
/// observers talk to the admin channel. Connections are plain event senders,
/// so the hub works the same behind a websocket or in-process.
#[derive(Clone, Default)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, id: ConnectionId, tx: mpsc::UnboundedSender<RelayEvent>) {
        self.inner.connections.insert(id, tx);
        debug!("Connection {} registered", id);
    }

    /// Drops a connection, leaving every channel. A registered observer is
    /// announced as gone to the admins of its room.
    pub fn remove_connection(&self, id: &ConnectionId) {
        self.inner.connections.remove(id);

        for mut entry in self.inner.members.iter_mut() {
            entry.value_mut().remove(id);
        }
        self.inner.members.retain(|_, set| !set.is_empty());

        let rooms: Vec<RoomId> = self
            .inner
            .observers
            .iter()
            .filter(|entry| entry.value().iter().any(|(conn, _)| conn == id))
            .map(|entry| entry.key().clone())
            .collect();
        for room_id in rooms {
            let gone = self.unregister_observers(&room_id, |(conn, _)| conn == id);
            for record in gone {
                self.announce_departure(&room_id, record);
            }
        }
        debug!("Connection {} removed", id);
    }

    /// Routes one event sent by `from`.
    pub fn route(&self, from: ConnectionId, event: RelayEvent) {
        debug!("{} -> '{}'", from, event.name());

        match event {
            RelayEvent::JoinRoom(room_id) => self.join(from, room_id, Channel::Room),
            RelayEvent::JoinAdminRoom(room_id) => {
                self.join(from, room_id.clone(), Channel::Admin);
                // Late admins get the current roster right away.
                self.send_to(&from, RelayEvent::ObserversUpdated(self.observers(&room_id)));
            }
            RelayEvent::JoinObserverRoom(room_id) => self.join(from, room_id, Channel::Observer),

            RelayEvent::ObserverJoinRoom(ObserverPresence { room_id, observer }) => {
                self.join(from, room_id.clone(), Channel::Observer);
                self.register_observer(from, &room_id, observer.clone());
                info!("Observer {} joined room {}", observer.observer_name, room_id);

                self.send_to_channel(
                    &room_id,
                    Channel::Admin,
                    RelayEvent::ObserverJoined(observer),
                    None,
                );
                self.send_roster(&room_id);
            }

            RelayEvent::ObserverLeaveRoom(departure) => {
                let room_id = departure.room_id;
                let observer_id = departure.observer.observer_id;
                let gone =
                    self.unregister_observers(&room_id, |(_, r)| r.observer_id == observer_id);
                self.leave(&from, &room_id, Channel::Observer);
                for record in gone {
                    self.announce_departure(&room_id, record);
                }
            }

            RelayEvent::ObserverRequestScreen(p) => {
                let request = ScreenRequest {
                    room_id: Some(p.room_id.clone()),
                    observer: Some(p.observer),
                };
                self.send_to_channel(
                    &p.room_id,
                    Channel::Admin,
                    RelayEvent::ObserverRequestedScreen(request),
                    None,
                );
            }

            RelayEvent::ObserverRequestOffer(p) => {
                let request = ScreenRequest {
                    room_id: Some(p.room_id.clone()),
                    observer: Some(p.observer),
                };
                self.send_to_channel(
                    &p.room_id,
                    Channel::Admin,
                    RelayEvent::ObserverRequestedOffer(request),
                    None,
                );
            }

            event @ (RelayEvent::ObserverOffer(_)
            | RelayEvent::ObserverAnswer(_)
            | RelayEvent::ObserverIceCandidate(_)
            | RelayEvent::ObserverScreenShareStopped(_)) => {
                let Some(room_id) = event.room_id().cloned() else {
                    return;
                };
                self.forward(from, &room_id, event);
            }

            // Legacy path: no room in the payload, goes to every room the admin is in.
            RelayEvent::ObserverScreenData(data) => {
                for room_id in self.rooms_of(&from, Channel::Admin) {
                    self.send_to_channel(
                        &room_id,
                        Channel::Observer,
                        RelayEvent::ObserverScreenData(data.clone()),
                        Some(&from),
                    );
                }
            }

            other => warn!(
                "Connection {} sent relay-only event '{}', ignoring",
                from,
                other.name()
            ),
        }
    }

    /// Pushes a permissions change to every observer of a room.
    pub fn publish_permissions(&self, room_id: &RoomId, permissions: serde_json::Value) {
        self.send_to_channel(
            room_id,
            Channel::Observer,
            RelayEvent::ObserverPermissionsUpdated(permissions),
            None,
        );
    }

    pub fn observers(&self, room_id: &RoomId) -> Vec<ObserverRecord> {
        self.inner
            .observers
            .get(room_id)
            .map(|list| list.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room_id: &RoomId, channel: Channel) -> usize {
        self.inner
            .members
            .get(&(room_id.clone(), channel))
            .map_or(0, |set| set.len())
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    fn join(&self, conn: ConnectionId, room_id: RoomId, channel: Channel) {
        debug!("{} joined {:?} channel of room {}", conn, channel, room_id);
        self.inner
            .members
            .entry((room_id, channel))
            .or_default()
            .insert(conn);
    }

    fn leave(&self, conn: &ConnectionId, room_id: &RoomId, channel: Channel) {
        let key = (room_id.clone(), channel);
        if let Some(mut set) = self.inner.members.get_mut(&key) {
            set.remove(conn);
        }
        self.inner.members.remove_if(&key, |_, set| set.is_empty());
    }

    fn is_member(&self, conn: &ConnectionId, room_id: &RoomId, channel: Channel) -> bool {
        self.inner
            .members
            .get(&(room_id.clone(), channel))
            .is_some_and(|set| set.contains(conn))
    }

    fn rooms_of(&self, conn: &ConnectionId, channel: Channel) -> Vec<RoomId> {
        self.inner
            .members
            .iter()
            .filter(|entry| entry.key().1 == channel && entry.value().contains(conn))
            .map(|entry| entry.key().0.clone())
            .collect()
    }

    /// Negotiation traffic: admin to observers, observer to admins.
    fn forward(&self, from: ConnectionId, room_id: &RoomId, event: RelayEvent) {
        if self.is_member(&from, room_id, Channel::Admin) {
            let admins = self.channel_members(room_id, Channel::Admin);
            for conn in self.channel_members(room_id, Channel::Observer) {
                if !admins.contains(&conn) {
                    self.send_to(&conn, event.clone());
                }
            }
        } else if self.is_member(&from, room_id, Channel::Observer) {
            self.send_to_channel(room_id, Channel::Admin, event, Some(&from));
        } else {
            warn!(
                "Connection {} is not in room {}, dropping '{}'",
                from,
                room_id,
                event.name()
            );
        }
    }

    fn register_observer(&self, conn: ConnectionId, room_id: &RoomId, record: ObserverRecord) {
        let mut list = self.inner.observers.entry(room_id.clone()).or_default();
        list.retain(|(_, r)| r.observer_id != record.observer_id);
        list.push((conn, record));
    }

    fn unregister_observers<F>(&self, room_id: &RoomId, matches: F) -> Vec<ObserverRecord>
    where
        F: Fn(&(ConnectionId, ObserverRecord)) -> bool,
    {
        let mut gone = Vec::new();
        if let Some(mut list) = self.inner.observers.get_mut(room_id) {
            let (left, stayed): (Vec<_>, Vec<_>) = list.drain(..).partition(|entry| matches(entry));
            *list = stayed;
            gone = left.into_iter().map(|(_, record)| record).collect();
        }
        self.inner.observers.remove_if(room_id, |_, list| list.is_empty());
        gone
    }

    fn announce_departure(&self, room_id: &RoomId, record: ObserverRecord) {
        info!("Observer {} left room {}", record.observer_name, room_id);
        self.send_to_channel(
            room_id,
            Channel::Admin,
            RelayEvent::ObserverLeft(record),
            None,
        );
        self.send_roster(room_id);
    }

    fn send_roster(&self, room_id: &RoomId) {
        self.send_to_channel(
            room_id,
            Channel::Admin,
            RelayEvent::ObserversUpdated(self.observers(room_id)),
            None,
        );
    }

    fn channel_members(&self, room_id: &RoomId, channel: Channel) -> Vec<ConnectionId> {
        self.inner
            .members
            .get(&(room_id.clone(), channel))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn send_to_channel(
        &self,
        room_id: &RoomId,
        channel: Channel,
        event: RelayEvent,
        except: Option<&ConnectionId>,
    ) {
        for conn in self.channel_members(room_id, channel) {
            if Some(&conn) != except {
                self.send_to(&conn, event.clone());
            }
        }
    }

    fn send_to(&self, conn: &ConnectionId, event: RelayEvent) {
        let Some(tx) = self.inner.connections.get(conn) else {
            warn!("Attempted to send '{}' to disconnected {}", event.name(), conn);
            return;
        };
        if tx.send(event).is_err() {
            warn!("Connection {} is closing, event dropped", conn);
        }
    }
}

use dashmap::DashMap;
use screenwatch_core::{EventName, RelayEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

pub type Listener = mpsc::UnboundedSender<RelayEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Name-keyed listener registry shared by transport implementations.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    by_name: DashMap<EventName, Vec<(ListenerId, Listener)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, name: EventName, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.by_name.entry(name).or_default().push((id, listener));
        id
    }

    pub fn off(&self, name: EventName, id: ListenerId) {
        if let Some(mut list) = self.by_name.get_mut(&name) {
            list.retain(|(lid, _)| *lid != id);
        }
    }

    /// Hands the event to every listener of its name; returns how many took it.
    /// Listeners whose receiving side is gone are pruned.
    pub fn dispatch(&self, event: RelayEvent) -> usize {
        let name = event.name();
        let Some(mut list) = self.by_name.get_mut(&name) else {
            debug!("No listener for '{}', dropping", name);
            return 0;
        };

        list.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        list.len()
    }

    pub fn count(&self, name: EventName) -> usize {
        self.by_name.get(&name).map(|l| l.len()).unwrap_or(0)
    }
}

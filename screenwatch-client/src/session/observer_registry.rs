use screenwatch_core::ObserverRecord;

/// Admin-side list of observers currently in the room, in join order.
#[derive(Debug, Default, Clone)]
pub struct ObserverRegistry {
    observers: Vec<ObserverRecord>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or refreshes an observer; returns `true` when it was not known yet.
    pub fn insert(&mut self, record: ObserverRecord) -> bool {
        match self
            .observers
            .iter_mut()
            .find(|o| o.observer_id == record.observer_id)
        {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                self.observers.push(record);
                true
            }
        }
    }

    pub fn remove(&mut self, observer_id: &str) -> Option<ObserverRecord> {
        let index = self
            .observers
            .iter()
            .position(|o| o.observer_id == observer_id)?;
        Some(self.observers.remove(index))
    }

    pub fn replace_all(&mut self, observers: Vec<ObserverRecord>) {
        self.observers = observers;
    }

    pub fn list(&self) -> Vec<ObserverRecord> {
        self.observers.clone()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

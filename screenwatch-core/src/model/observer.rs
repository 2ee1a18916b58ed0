use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remote observer as announced over the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverRecord {
    pub observer_id: String,
    pub observer_email: String,
    pub observer_name: String,
    pub observer_role: String,
    pub joined_at: DateTime<Utc>,
}

/// Account data an observer session announces itself with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverProfile {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
}

impl ObserverProfile {
    /// "First Last" when either name is present, otherwise the capitalised role label.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if !parts.is_empty() {
            return parts.join(" ");
        }

        let role = self.role.trim();
        let mut chars = role.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Observer".to_owned(),
        }
    }

    pub fn to_record(&self, joined_at: DateTime<Utc>) -> ObserverRecord {
        ObserverRecord {
            observer_id: self.id.clone(),
            observer_email: self.email.clone(),
            observer_name: self.display_name(),
            observer_role: self.role.clone(),
            joined_at,
        }
    }
}

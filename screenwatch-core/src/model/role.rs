use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which branch of the observer protocol a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Captures the screen and broadcasts it to observers.
    Admin,
    /// Passively receives the admin's stream.
    Observer,
    /// Regular meeting member, outside the observer protocol.
    Participant,
}

impl Role {
    /// Maps an account role label onto a protocol role. Unknown labels are plain participants.
    pub fn from_account_role(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "admin" | "superadmin" | "super_admin" => Self::Admin,
            "observer" => Self::Observer,
            _ => Self::Participant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Observer => "observer",
            Self::Participant => "participant",
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_account_role(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Activity trail models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of recorded activity. Stored as its snake_case text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    AccountCreated,
    NewLogin,
    ClientAuthorized,
    ClientSynced,
    NoteDeployed,
    NoteUndeployed,
    ProfileNameUpdated,
    ProfileDescriptionUpdated,
}

impl ActivityKind {
    /// All known kinds.
    pub const ALL: [ActivityKind; 8] = [
        ActivityKind::AccountCreated,
        ActivityKind::NewLogin,
        ActivityKind::ClientAuthorized,
        ActivityKind::ClientSynced,
        ActivityKind::NoteDeployed,
        ActivityKind::NoteUndeployed,
        ActivityKind::ProfileNameUpdated,
        ActivityKind::ProfileDescriptionUpdated,
    ];

    /// Database text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::AccountCreated => "account_created",
            ActivityKind::NewLogin => "new_login",
            ActivityKind::ClientAuthorized => "client_authorized",
            ActivityKind::ClientSynced => "client_synced",
            ActivityKind::NoteDeployed => "note_deployed",
            ActivityKind::NoteUndeployed => "note_undeployed",
            ActivityKind::ProfileNameUpdated => "profile_name_updated",
            ActivityKind::ProfileDescriptionUpdated => "profile_description_updated",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown activity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActivityKind(pub String);

impl fmt::Display for UnknownActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown activity type '{}'", self.0)
    }
}

impl std::error::Error for UnknownActivityKind {}

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownActivityKind(s.to_string()))
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "activity_type")]
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Activity to be appended.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub kind: ActivityKind,
    pub description: String,
}

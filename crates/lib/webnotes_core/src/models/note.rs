//! Note domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored note, including its body.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: String,
    pub source_identifier: String,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub deployed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

/// A stored note without its body, as returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: String,
    pub source_identifier: String,
    pub title: String,
    pub slug: String,
    pub deployed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            source: note.source.clone(),
            source_identifier: note.source_identifier.clone(),
            title: note.title.clone(),
            slug: note.slug.clone(),
            deployed: note.deployed,
            created_at: note.created_at,
            updated_at: note.updated_at,
            inserted_at: note.inserted_at,
        }
    }
}

/// A note pushed by a sync source.
///
/// This is the wire shape of the sync ingress and is shared with the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingNote {
    /// Origin system tag (e.g. `apple_notes`).
    pub source: String,
    /// Identifier of the note inside its origin system. Empty means "never match".
    #[serde(default)]
    pub source_identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Explicit slug; derived from the title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl IncomingNote {
    /// Natural key of this note.
    pub fn key(&self) -> NoteKey {
        NoteKey::new(&self.source, &self.source_identifier)
    }

    /// Whether this note can be matched against stored rows.
    pub fn is_matchable(&self) -> bool {
        !self.source_identifier.is_empty()
    }
}

/// Row to insert, or the mutable fields to overwrite on update.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub user_id: Uuid,
    pub source: String,
    pub source_identifier: String,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Natural key of a note within one owner: (origin system, origin-local identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteKey {
    pub source: String,
    pub source_identifier: String,
}

impl NoteKey {
    pub fn new(source: &str, source_identifier: &str) -> Self {
        Self {
            source: source.to_string(),
            source_identifier: source_identifier.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_note_accepts_minimal_payload() {
        let note: IncomingNote = serde_json::from_value(serde_json::json!({
            "source": "agent",
            "source_identifier": "n1",
            "title": "Hello World",
            "body": "hi",
        }))
        .unwrap();
        assert_eq!(note.key(), NoteKey::new("agent", "n1"));
        assert!(note.is_matchable());
        assert!(note.created_at.is_none());
        assert!(note.slug.is_none());
    }

    #[test]
    fn empty_identifier_is_not_matchable() {
        let note: IncomingNote =
            serde_json::from_value(serde_json::json!({ "source": "agent", "title": "x" }))
                .unwrap();
        assert!(!note.is_matchable());
    }
}

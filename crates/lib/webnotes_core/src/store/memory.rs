//! In-process store.
//!
//! Enforces the same uniqueness rules as the PostgreSQL schema. Used by the
//! server's `--ephemeral` mode and by tests.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, ActivityStore, Constraint, NoteStore, StoreError};
use crate::models::{
    Account, Activity, ActivityKind, NewAccount, NewActivity, NewNote, Note, NoteKey,
    NoteSummary,
};
use crate::uuid::uuidv7;

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    notes: Vec<Note>,
    activities: Vec<Activity>,
}

/// Store backed by in-memory tables behind a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.username == account.username) {
            return Err(StoreError::UniqueViolation(Constraint::AccountUsername));
        }
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(Constraint::AccountEmail));
        }
        let row = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            name: account.name,
            description: String::new(),
            avatar_url: account.avatar_url,
            created_at: Utc::now(),
        };
        tables.accounts.push(row.clone());
        Ok(row)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().any(|a| a.username == username))
    }

    async fn update_account_name(&self, id: Uuid, name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        account.name = name.to_string();
        Ok(())
    }

    async fn update_account_description(
        &self,
        id: Uuid,
        description: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        account.description = description.to_string();
        Ok(())
    }
}

fn same_key(note: &Note, user_id: Uuid, source: &str, source_identifier: &str) -> bool {
    !source_identifier.is_empty()
        && note.user_id == user_id
        && note.source == source
        && note.source_identifier == source_identifier
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn note_keys(&self, user_id: Uuid) -> Result<HashSet<NoteKey>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.user_id == user_id && !n.source_identifier.is_empty())
            .map(|n| NoteKey::new(&n.source, &n.source_identifier))
            .collect())
    }

    async fn insert_note(&self, note: &NewNote) -> Result<Note, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .notes
            .iter()
            .any(|n| same_key(n, note.user_id, &note.source, &note.source_identifier))
        {
            return Err(StoreError::UniqueViolation(Constraint::NoteSourceIdentifier));
        }
        if tables
            .notes
            .iter()
            .any(|n| n.user_id == note.user_id && n.slug == note.slug)
        {
            return Err(StoreError::UniqueViolation(Constraint::NoteSlug));
        }
        let row = Note {
            id: uuidv7(),
            user_id: note.user_id,
            source: note.source.clone(),
            source_identifier: note.source_identifier.clone(),
            title: note.title.clone(),
            body: note.body.clone(),
            slug: note.slug.clone(),
            deployed: false,
            created_at: note.created_at,
            updated_at: note.updated_at,
            inserted_at: Utc::now(),
        };
        tables.notes.push(row.clone());
        Ok(row)
    }

    async fn update_note(&self, note: &NewNote) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .notes
            .iter_mut()
            .find(|n| same_key(n, note.user_id, &note.source, &note.source_identifier))
        else {
            return Ok(false);
        };
        row.title = note.title.clone();
        row.body = note.body.clone();
        row.created_at = note.created_at;
        row.updated_at = note.updated_at;
        Ok(true)
    }

    async fn note_by_id(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.notes.iter().find(|n| n.id == id).cloned())
    }

    async fn note_by_slug(&self, user_id: Uuid, slug: &str) -> Result<Option<Note>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .iter()
            .find(|n| n.user_id == user_id && n.slug == slug)
            .cloned())
    }

    async fn list_notes(
        &self,
        user_id: Uuid,
        deployed_only: bool,
    ) -> Result<Vec<NoteSummary>, StoreError> {
        let tables = self.tables.read().await;
        let mut notes: Vec<NoteSummary> = tables
            .notes
            .iter()
            .filter(|n| n.user_id == user_id && (n.deployed || !deployed_only))
            .map(NoteSummary::from)
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn count_notes(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.notes.iter().filter(|n| n.user_id == user_id).count() as i64)
    }

    async fn set_deployed(
        &self,
        id: Uuid,
        user_id: Uuid,
        deployed: bool,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(note) => {
                note.deployed = deployed;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        let mut tables = self.tables.write().await;
        let row = Activity {
            id: uuidv7(),
            user_id: activity.user_id,
            kind: activity.kind,
            description: activity.description,
            timestamp: Utc::now(),
        };
        tables.activities.push(row.clone());
        Ok(row)
    }

    async fn list_activities(
        &self,
        user_id: Uuid,
        before: Option<DateTime<Utc>>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        let tables = self.tables.read().await;
        // Insertion order is chronological, so reverse iteration is newest first.
        Ok(tables
            .activities
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .filter(|a| before.is_none_or(|at| a.timestamp < at))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn last_activity(
        &self,
        user_id: Uuid,
        kind: ActivityKind,
    ) -> Result<Option<Activity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .activities
            .iter()
            .rev()
            .find(|a| a.user_id == user_id && a.kind == kind)
            .cloned())
    }
}

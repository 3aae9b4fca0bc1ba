//! Credential store abstraction.
//!
//! The domain talks to persistence only through these traits. Uniqueness is
//! enforced by the store itself and reported as a tagged
//! [`StoreError::UniqueViolation`]; this is the only cross-request
//! coordination the service relies on.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, Activity, ActivityKind, NewAccount, NewActivity, NewNote, Note, NoteKey,
    NoteSummary,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Uniqueness constraints the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// `(username)`
    AccountUsername,
    /// `(email)`
    AccountEmail,
    /// `(user, source, source_identifier)`
    NoteSourceIdentifier,
    /// `(user, slug)`
    NoteSlug,
}

impl Constraint {
    /// Name of the backing index in the PostgreSQL schema.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::AccountUsername => "users_username_key",
            Constraint::AccountEmail => "users_email_key",
            Constraint::NoteSourceIdentifier => "notes_user_source_identifier_key",
            Constraint::NoteSlug => "notes_user_slug_key",
        }
    }

    /// Resolve a constraint from its index name.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Constraint::AccountUsername,
            Constraint::AccountEmail,
            Constraint::NoteSourceIdentifier,
            Constraint::NoteSlug,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    #[error("Record not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether this is a violation of the given constraint.
    pub fn is_violation_of(&self, constraint: Constraint) -> bool {
        matches!(self, StoreError::UniqueViolation(c) if *c == constraint)
    }
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account and return it with its generated id.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn update_account_name(&self, id: Uuid, name: &str) -> Result<(), StoreError>;

    async fn update_account_description(
        &self,
        id: Uuid,
        description: &str,
    ) -> Result<(), StoreError>;
}

/// Note persistence.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All natural keys stored for an owner, in one query.
    async fn note_keys(&self, user_id: Uuid) -> Result<HashSet<NoteKey>, StoreError>;

    /// Insert a new note. Slug collisions surface as
    /// `UniqueViolation(Constraint::NoteSlug)`.
    async fn insert_note(&self, note: &NewNote) -> Result<Note, StoreError>;

    /// Overwrite title, body and timestamps of the row matched by
    /// `(user_id, source, source_identifier)`. Returns whether a row matched.
    async fn update_note(&self, note: &NewNote) -> Result<bool, StoreError>;

    async fn note_by_id(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn note_by_slug(&self, user_id: Uuid, slug: &str) -> Result<Option<Note>, StoreError>;

    /// List an owner's notes, newest update first.
    async fn list_notes(
        &self,
        user_id: Uuid,
        deployed_only: bool,
    ) -> Result<Vec<NoteSummary>, StoreError>;

    async fn count_notes(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// Set the deployed flag on a note the owner holds. Returns whether a row matched.
    async fn set_deployed(
        &self,
        id: Uuid,
        user_id: Uuid,
        deployed: bool,
    ) -> Result<bool, StoreError>;
}

/// Activity trail persistence.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity, StoreError>;

    /// Newest first; `before` restricts to records strictly older than it.
    async fn list_activities(
        &self,
        user_id: Uuid,
        before: Option<DateTime<Utc>>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError>;

    async fn last_activity(
        &self,
        user_id: Uuid,
        kind: ActivityKind,
    ) -> Result<Option<Activity>, StoreError>;
}

/// The full credential store.
pub trait Store: AccountStore + NoteStore + ActivityStore {}

impl<T: AccountStore + NoteStore + ActivityStore> Store for T {}

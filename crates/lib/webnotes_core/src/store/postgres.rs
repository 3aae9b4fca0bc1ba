//! PostgreSQL-backed store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, ActivityStore, Constraint, NoteStore, StoreError};
use crate::models::{
    Account, Activity, ActivityKind, NewAccount, NewActivity, NewNote, Note, NoteKey,
    NoteSummary,
};
use crate::uuid::uuidv7;

const ACCOUNT_COLUMNS: &str =
    "id, username, email, password_hash, name, description, avatar_url, created_at";

const NOTE_COLUMNS: &str = "id, user_id, source, COALESCE(source_identifier, '') AS source_identifier, \
     title, body, slug, deployed, created_at, updated_at, inserted_at";

const NOTE_SUMMARY_COLUMNS: &str = "id, user_id, source, COALESCE(source_identifier, '') AS source_identifier, \
     title, slug, deployed, created_at, updated_at, inserted_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                match db.constraint().and_then(Constraint::from_name) {
                    Some(constraint) => StoreError::UniqueViolation(constraint),
                    None => StoreError::Database(e.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Row shape of the `activities` table.
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    user_id: Uuid,
    activity_type: String,
    description: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = StoreError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let kind = row
            .activity_type
            .parse::<ActivityKind>()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Activity {
            id: row.id,
            user_id: row.user_id,
            kind,
            description: row.description,
            timestamp: row.timestamp,
        })
    }
}

/// Store over a pooled PostgreSQL connection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn account_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, name, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.name)
            .bind(&account.avatar_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.account_where("username", username).await
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.account_where("email", email).await
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn update_account_name(&self, id: Uuid, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_account_description(
        &self,
        id: Uuid,
        description: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET description = $1 WHERE id = $2")
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn note_keys(&self, user_id: Uuid) -> Result<HashSet<NoteKey>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT source, source_identifier FROM notes \
             WHERE user_id = $1 AND source_identifier IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(source, source_identifier)| NoteKey {
                source,
                source_identifier,
            })
            .collect())
    }

    async fn insert_note(&self, note: &NewNote) -> Result<Note, StoreError> {
        let sql = format!(
            "INSERT INTO notes \
             (id, user_id, source, source_identifier, title, body, slug, created_at, updated_at) \
             VALUES ($1, $2, $3, NULLIF($4, ''), $5, $6, $7, $8, $9) \
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Note>(&sql)
            .bind(uuidv7())
            .bind(note.user_id)
            .bind(&note.source)
            .bind(&note.source_identifier)
            .bind(&note.title)
            .bind(&note.body)
            .bind(&note.slug)
            .bind(note.created_at)
            .bind(note.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_note(&self, note: &NewNote) -> Result<bool, StoreError> {
        if note.source_identifier.is_empty() {
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE notes SET title = $1, body = $2, created_at = $3, updated_at = $4 \
             WHERE user_id = $5 AND source = $6 AND source_identifier = $7",
        )
        .bind(&note.title)
        .bind(&note.body)
        .bind(note.created_at)
        .bind(note.updated_at)
        .bind(note.user_id)
        .bind(&note.source)
        .bind(&note.source_identifier)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn note_by_id(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1");
        let row = sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn note_by_slug(&self, user_id: Uuid, slug: &str) -> Result<Option<Note>, StoreError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 AND slug = $2");
        let row = sqlx::query_as::<_, Note>(&sql)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_notes(
        &self,
        user_id: Uuid,
        deployed_only: bool,
    ) -> Result<Vec<NoteSummary>, StoreError> {
        let sql = format!(
            "SELECT {NOTE_SUMMARY_COLUMNS} FROM notes \
             WHERE user_id = $1 AND (deployed OR NOT $2) \
             ORDER BY updated_at DESC"
        );
        let rows = sqlx::query_as::<_, NoteSummary>(&sql)
            .bind(user_id)
            .bind(deployed_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_notes(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn set_deployed(
        &self,
        id: Uuid,
        user_id: Uuid,
        deployed: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notes SET deployed = $1 WHERE id = $2 AND user_id = $3")
            .bind(deployed)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activities (id, user_id, activity_type, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, activity_type, description, "timestamp"
            "#,
        )
        .bind(uuidv7())
        .bind(activity.user_id)
        .bind(activity.kind.as_str())
        .bind(&activity.description)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_activities(
        &self,
        user_id: Uuid,
        before: Option<DateTime<Utc>>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, user_id, activity_type, description, "timestamp"
            FROM activities
            WHERE user_id = $1 AND ($2::timestamptz IS NULL OR "timestamp" < $2)
            ORDER BY "timestamp" DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(before)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Activity::try_from).collect()
    }

    async fn last_activity(
        &self,
        user_id: Uuid,
        kind: ActivityKind,
    ) -> Result<Option<Activity>, StoreError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, user_id, activity_type, description, "timestamp"
            FROM activities
            WHERE user_id = $1 AND activity_type = $2
            ORDER BY "timestamp" DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Activity::try_from).transpose()
    }
}

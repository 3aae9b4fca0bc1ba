//! Activity trail.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::{Activity, ActivityKind, NewActivity};
use crate::store::{ActivityStore, StoreError};

/// Page size when none is requested.
pub const DEFAULT_LIMIT: i64 = 25;
/// Largest page size served.
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("no activity found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Page of the activity trail, newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Unix milliseconds; only older records are returned.
    pub load_time: Option<i64>,
}

/// Append a record. Failures are logged and swallowed so the triggering
/// request never fails on audit.
pub async fn record<S: ActivityStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    kind: ActivityKind,
    description: impl Into<String>,
) {
    let activity = NewActivity {
        user_id,
        kind,
        description: description.into(),
    };
    if let Err(e) = store.insert_activity(activity).await {
        warn!(user_id = %user_id, activity = %kind, error = %e, "failed to record activity");
    }
}

pub async fn list<S: ActivityStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    query: ActivityQuery,
) -> Result<Vec<Activity>, ActivityError> {
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if offset < 0 || limit < 0 {
        return Err(ActivityError::Validation(
            "offset and limit must not be negative".into(),
        ));
    }
    let before = match query.load_time {
        None => None,
        Some(ms) if ms < 0 => {
            return Err(ActivityError::Validation(
                "load_time must not be negative".into(),
            ));
        }
        Some(ms) => Some(
            DateTime::<Utc>::from_timestamp_millis(ms)
                .ok_or_else(|| ActivityError::Validation("load_time out of range".into()))?,
        ),
    };
    Ok(store
        .list_activities(user_id, before, offset, limit.min(MAX_LIMIT))
        .await?)
}

/// Most recent record of `kind`, parsed from its text form.
pub async fn last_of<S: ActivityStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    kind: &str,
) -> Result<Activity, ActivityError> {
    let kind = kind
        .parse::<ActivityKind>()
        .map_err(|e| ActivityError::Validation(e.to_string()))?;
    store
        .last_activity(user_id, kind)
        .await?
        .ok_or(ActivityError::NotFound)
}

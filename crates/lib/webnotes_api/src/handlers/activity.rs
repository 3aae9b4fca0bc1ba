//! Activity trail request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use webnotes_core::activity::{self, ActivityQuery};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{AppPath, AppQuery};
use crate::middleware::auth::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Unix milliseconds.
    pub load_time: Option<i64>,
}

/// `GET /activity?offset=&limit=&load_time=` — newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppQuery(params): AppQuery<ListParams>,
) -> AppResult<Json<Value>> {
    let query = ActivityQuery {
        offset: params.offset,
        limit: params.limit,
        load_time: params.load_time,
    };
    let activities = activity::list(state.store.as_ref(), account.id, query).await?;
    Ok(Json(json!({ "error": null, "activities": activities })))
}

/// `GET /activity/{kind}` — most recent record of one kind.
pub async fn last_of(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppPath(kind): AppPath<String>,
) -> AppResult<Json<Value>> {
    let activity = activity::last_of(state.store.as_ref(), account.id, &kind).await?;
    Ok(Json(json!({ "error": null, "activity": activity })))
}

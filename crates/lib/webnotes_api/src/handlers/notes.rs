//! Note request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;
use webnotes_core::activity;
use webnotes_core::models::{ActivityKind, IncomingNote};
use webnotes_core::notes;
use webnotes_core::store::NoteStore;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::{AuthenticatedUser, MaybeUser};

/// Unparseable ids read the same as missing notes.
fn note_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found())
}

/// `GET /notes/list` — the caller's notes, without bodies.
pub async fn list_own(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
) -> AppResult<Json<Value>> {
    let notes = state.store.list_notes(account.id, false).await?;
    Ok(Json(json!({ "error": null, "notes": notes })))
}

/// `GET /notes/list/{username}` — a user's deployed notes.
pub async fn list_deployed(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
) -> AppResult<Json<Value>> {
    let notes = notes::deployed_notes_of(state.store.as_ref(), &username).await?;
    Ok(Json(json!({ "error": null, "notes": notes })))
}

/// `POST /notes/list` — reconcile a batch pushed by a sync client.
pub async fn sync(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppJson(batch): AppJson<Vec<IncomingNote>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let received = batch.len();
    let report = notes::reconcile(state.store.as_ref(), account.id, batch).await?;
    activity::record(
        state.store.as_ref(),
        account.id,
        ActivityKind::ClientSynced,
        format!("{received} notes synced successfully"),
    )
    .await;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "error": null,
            "inserted": report.inserted,
            "updated": report.updated,
        })),
    ))
}

async fn change_deployment(
    state: &AppState,
    account_id: Uuid,
    raw_id: &str,
    deployed: bool,
) -> AppResult<Json<Value>> {
    let id = note_id(raw_id)?;
    notes::set_deployed(state.store.as_ref(), id, account_id, deployed).await?;
    let (kind, verb) = if deployed {
        (ActivityKind::NoteDeployed, "deployed")
    } else {
        (ActivityKind::NoteUndeployed, "undeployed")
    };
    activity::record(
        state.store.as_ref(),
        account_id,
        kind,
        format!("note {id} {verb} successfully"),
    )
    .await;
    Ok(Json(json!({
        "error": null,
        "message": format!("note {verb} successfully"),
    })))
}

/// `POST /notes/deploy/{id}` — publish a note.
pub async fn deploy(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<Value>> {
    change_deployment(&state, account.id, &id, true).await
}

/// `DELETE /notes/deploy/{id}` — unpublish a note.
pub async fn undeploy(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<Value>> {
    change_deployment(&state, account.id, &id, false).await
}

/// `GET /notes/count`
pub async fn count(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
) -> AppResult<Json<Value>> {
    let count = state.store.count_notes(account.id).await?;
    Ok(Json(json!({ "error": null, "count": count })))
}

/// `GET /notes/{id}` — a note, if the requester may see it.
pub async fn note_by_id(
    State(state): State<AppState>,
    Extension(viewer): Extension<MaybeUser>,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<Value>> {
    let note = notes::visible_note_by_id(state.store.as_ref(), note_id(&id)?, viewer.id()).await?;
    Ok(Json(json!({ "error": null, "note": note })))
}

/// `GET /notes/{username}/{slug}` — a note by its public address.
pub async fn note_by_slug(
    State(state): State<AppState>,
    Extension(viewer): Extension<MaybeUser>,
    AppPath((username, slug)): AppPath<(String, String)>,
) -> AppResult<Json<Value>> {
    let note =
        notes::visible_note_by_slug(state.store.as_ref(), &username, &slug, viewer.id()).await?;
    Ok(Json(json!({ "error": null, "note": note })))
}

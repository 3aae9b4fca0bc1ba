//! Profile request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use webnotes_core::activity;
use webnotes_core::models::{Account, ActivityKind, PublicProfile};
use webnotes_core::store::{AccountStore, ActivityStore};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthenticatedUser;

/// Public profile plus whether a desktop client was ever authorized.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub error: Option<String>,
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub has_connected_client: bool,
}

async fn profile_of(state: &AppState, account: &Account) -> AppResult<Json<ProfileResponse>> {
    let has_connected_client = state
        .store
        .last_activity(account.id, ActivityKind::ClientAuthorized)
        .await?
        .is_some();
    Ok(Json(ProfileResponse {
        error: None,
        profile: PublicProfile::from(account),
        has_connected_client,
    }))
}

/// `GET /profile` — the caller's own profile.
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ProfileResponse>> {
    profile_of(&state, &account).await
}

/// `GET /profile/{username}`
pub async fn public_profile(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
) -> AppResult<Json<ProfileResponse>> {
    let account = state
        .store
        .account_by_username(&username)
        .await?
        .ok_or_else(AppError::not_found)?;
    profile_of(&state, &account).await
}

#[derive(Debug, Deserialize)]
pub struct EditName {
    #[serde(default)]
    pub name: String,
}

/// `PATCH /profile/edit/name`
pub async fn edit_name(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<EditName>,
) -> AppResult<Json<Value>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("missing name field".into()));
    }
    state.store.update_account_name(account.id, name).await?;
    activity::record(
        state.store.as_ref(),
        account.id,
        ActivityKind::ProfileNameUpdated,
        format!("name changed to {name}"),
    )
    .await;
    Ok(Json(json!({ "error": null })))
}

#[derive(Debug, Deserialize)]
pub struct EditDescription {
    #[serde(default)]
    pub description: String,
}

/// `PATCH /profile/edit/description` — an empty description clears it.
pub async fn edit_description(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<EditDescription>,
) -> AppResult<Json<Value>> {
    state
        .store
        .update_account_description(account.id, body.description.trim())
        .await?;
    activity::record(
        state.store.as_ref(),
        account.id,
        ActivityKind::ProfileDescriptionUpdated,
        "description updated",
    )
    .await;
    Ok(Json(json!({ "error": null })))
}

//! Account and session request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use url::{Host, Url};
use webnotes_core::activity;
use webnotes_core::auth::{Credentials, Registration};
use webnotes_core::models::ActivityKind;
use webnotes_core::store::AccountStore;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::cookies::{clear_session_cookie, session_cookie};

/// `GET /accounts/me` — the signed-in account.
pub async fn me(Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>) -> Json<Value> {
    Json(json!({ "error": null, "account": account }))
}

/// `GET /accounts/authcode` — mint a short-lived auth code for a detached client.
pub async fn auth_code(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
) -> AppResult<Json<Value>> {
    let code = state.sessions.issue_auth_code(account.id)?;
    Ok(Json(json!({ "error": null, "code": code })))
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub redirect_uri: String,
}

/// Only loopback `http` listeners may receive auth codes.
fn loopback_redirect(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    let loopback = match url.host()? {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback(),
        Host::Ipv6(ip) => ip.is_loopback(),
    };
    loopback.then_some(url)
}

/// `GET /accounts/authorize?redirect_uri=` — mint an auth code and hand it to
/// the agent's local callback listener.
pub async fn authorize(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
    AppQuery(query): AppQuery<AuthorizeQuery>,
) -> AppResult<Redirect> {
    let mut target = loopback_redirect(&query.redirect_uri).ok_or_else(|| {
        AppError::Validation("redirect_uri must be an http loopback address".into())
    })?;
    let code = state.sessions.issue_auth_code(account.id)?;
    target.query_pairs_mut().append_pair("code", &code);
    info!(user_id = %account.id, "auth code handed to local client");
    Ok(Redirect::to(target.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub code: String,
}

/// `POST /accounts/exchangeAuthCode` — trade an auth code for a long-lived
/// session token, returned in the body.
pub async fn exchange_auth_code(
    State(state): State<AppState>,
    AppJson(body): AppJson<ExchangeRequest>,
) -> AppResult<Json<Value>> {
    let grant = state
        .sessions
        .exchange_auth_code(state.store.as_ref(), &body.code)
        .await?;
    activity::record(
        state.store.as_ref(),
        grant.account.id,
        ActivityKind::ClientAuthorized,
        "desktop client authorized",
    )
    .await;
    Ok(Json(json!({ "error": null, "session_token": grant.token })))
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

/// `GET /accounts/usernameExists?username=`
pub async fn username_exists(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UsernameQuery>,
) -> AppResult<Json<Value>> {
    let username = query.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation(
            "missing username query parameter".into(),
        ));
    }
    let exists = state.store.username_exists(username).await?;
    Ok(Json(json!({ "error": null, "exists": exists })))
}

/// `POST /accounts/login` — check credentials and set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<Credentials>,
) -> AppResult<impl IntoResponse> {
    let grant = state.sessions.login(state.store.as_ref(), body).await?;
    activity::record(
        state.store.as_ref(),
        grant.account.id,
        ActivityKind::NewLogin,
        "new login",
    )
    .await;
    let jar = jar.add(session_cookie(&grant.token, grant.ttl, &state.config.cookie));
    Ok((jar, Json(json!({ "error": null }))))
}

/// `POST /accounts/register` — create an account and set the session cookie.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<Registration>,
) -> AppResult<impl IntoResponse> {
    let grant = state.sessions.register(state.store.as_ref(), body).await?;
    activity::record(
        state.store.as_ref(),
        grant.account.id,
        ActivityKind::AccountCreated,
        format!("account @{} created", grant.account.username),
    )
    .await;
    let jar = jar.add(session_cookie(&grant.token, grant.ttl, &state.config.cookie));
    Ok((StatusCode::CREATED, jar, Json(json!({ "error": null }))))
}

/// `POST /accounts/logout` — drop the cookie. The token itself stays valid
/// until it expires.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(clear_session_cookie(&state.config.cookie));
    (jar, Json(json!({ "error": null })))
}

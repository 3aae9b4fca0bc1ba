//! Session gates: read the `session_token` cookie and resolve it to an account.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use webnotes_core::models::Account;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Account resolved by [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Account);

/// Account resolved by [`optional_session`], if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Account>);

impl MaybeUser {
    pub fn id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|a| a.id)
    }
}

fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}

/// Reject the request unless it carries a valid session for an existing account.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar).ok_or_else(AppError::unauthorized)?;
    let account = state
        .sessions
        .authenticate(state.store.as_ref(), token)
        .await?;
    request.extensions_mut().insert(AuthenticatedUser(account));
    Ok(next.run(request).await)
}

/// Resolve the session when there is one; anonymous otherwise.
pub async fn optional_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let account = state
        .sessions
        .authenticate_optional(state.store.as_ref(), session_token(&jar))
        .await?;
    request.extensions_mut().insert(MaybeUser(account));
    Ok(next.run(request).await)
}

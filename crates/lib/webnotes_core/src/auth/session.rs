//! Session protocol.
//!
//! Browser sessions are minted on register and login. A signed-in browser can
//! mint a short-lived auth code, which a detached process exchanges for its own
//! long-lived session without ever handling the password.
//!
//! Nothing is stored server side: logout only clears the cookie and an auth
//! code stays exchangeable until it expires.

use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::password::{hash_password, verify_password};
use super::token::{Purpose, TokenCodec};
use crate::models::{Account, NewAccount};
use crate::store::AccountStore;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Usernames that collide with static segments under `/notes`.
pub const RESERVED_USERNAMES: [&str; 2] = ["list", "deploy"];

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

/// Login form. Either `username` or `email` identifies the account;
/// `username` wins when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A freshly minted session for an account.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub account: Account,
    pub token: String,
    pub ttl: Duration,
}

/// Mints and checks session tokens against the account store.
#[derive(Clone)]
pub struct SessionAuthority {
    codec: TokenCodec,
    default_avatar_url: String,
}

impl SessionAuthority {
    /// Browser session lifetime.
    pub fn browser_ttl() -> Duration {
        Duration::days(7)
    }

    /// Auth-code lifetime.
    pub fn auth_code_ttl() -> Duration {
        Duration::minutes(10)
    }

    /// Agent session lifetime. The agent has nobody to re-login.
    pub fn agent_ttl() -> Duration {
        Duration::days(2000)
    }

    pub fn new(codec: TokenCodec, default_avatar_url: impl Into<String>) -> Self {
        Self {
            codec,
            default_avatar_url: default_avatar_url.into(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account and open a browser session for it.
    pub async fn register<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        form: Registration,
    ) -> Result<SessionGrant, AuthError> {
        validate_registration(&form)?;
        let password_hash = hash_password(&form.password)?;
        let account = store
            .insert_account(NewAccount {
                username: form.username.trim().to_string(),
                email: form.email.trim().to_string(),
                password_hash,
                name: form.name.trim().to_string(),
                avatar_url: self.default_avatar_url.clone(),
            })
            .await?;
        info!(user_id = %account.id, username = %account.username, "account registered");
        self.browser_session(account)
    }

    /// Check credentials and open a browser session.
    ///
    /// Unknown accounts and wrong passwords are indistinguishable to the caller.
    pub async fn login<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        credentials: Credentials,
    ) -> Result<SessionGrant, AuthError> {
        let username = credentials.username.trim();
        let email = credentials.email.trim();
        if (username.is_empty() && email.is_empty()) || credentials.password.is_empty() {
            return Err(AuthError::Validation(
                "missing fields (required username or email, and password)".into(),
            ));
        }

        let account = if !username.is_empty() {
            store.account_by_username(username).await?
        } else {
            store.account_by_email(email).await?
        };
        let Some(account) = account else {
            debug!("login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&credentials.password, &account.password_hash) {
            debug!(user_id = %account.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %account.id, "session created");
        self.browser_session(account)
    }

    /// Mint a short-lived auth code bound to an authenticated account.
    pub fn issue_auth_code(&self, account_id: Uuid) -> Result<String, AuthError> {
        Ok(self
            .codec
            .issue(account_id, Purpose::AuthCode, Self::auth_code_ttl())?)
    }

    /// Trade an auth code for a long-lived agent session.
    ///
    /// The code is not consumed; it can be exchanged again until it expires.
    pub async fn exchange_auth_code<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        code: &str,
    ) -> Result<SessionGrant, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::Validation("missing code field".into()));
        }
        let claims = self.codec.verify_purpose(code.trim(), Purpose::AuthCode)?;
        let account = store
            .account_by_id(claims.subject()?)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let ttl = Self::agent_ttl();
        let token = self.codec.issue(account.id, Purpose::Session, ttl)?;
        info!(user_id = %account.id, "auth code exchanged for agent session");
        Ok(SessionGrant {
            account,
            token,
            ttl,
        })
    }

    /// Resolve a session token to its account.
    pub async fn authenticate<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        token: &str,
    ) -> Result<Account, AuthError> {
        let claims = self
            .codec
            .verify_purpose(token, Purpose::Session)
            .inspect_err(|e| debug!(kind = e.kind(), "session token rejected"))?;
        store
            .account_by_id(claims.subject()?)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Like [`authenticate`](Self::authenticate), but a missing, invalid or
    /// orphaned token yields `None`. Store failures still surface.
    pub async fn authenticate_optional<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        token: Option<&str>,
    ) -> Result<Option<Account>, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        match self.authenticate(store, token).await {
            Ok(account) => Ok(Some(account)),
            Err(AuthError::Token(_) | AuthError::AccountNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn browser_session(&self, account: Account) -> Result<SessionGrant, AuthError> {
        let ttl = Self::browser_ttl();
        let token = self.codec.issue(account.id, Purpose::Session, ttl)?;
        Ok(SessionGrant {
            account,
            token,
            ttl,
        })
    }
}

fn validate_registration(form: &Registration) -> Result<(), AuthError> {
    let email = form.email.trim();
    let username = form.username.trim();
    let name = form.name.trim();
    if email.is_empty() || username.is_empty() || name.is_empty() || form.password.is_empty() {
        return Err(AuthError::Validation(
            "missing fields (required email, username, name, and password)".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("invalid email address".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AuthError::Validation(
            "username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(AuthError::Validation(format!(
            "username '{username}' is reserved"
        )));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

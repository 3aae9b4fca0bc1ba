//! Account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// `username` and `email` are each globally unique; the store enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub description: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

/// Account fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub avatar_url: String,
}

/// Publicly visible view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub description: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for PublicProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            name: account.name.clone(),
            description: account.description.clone(),
            avatar_url: account.avatar_url.clone(),
            created_at: account.created_at,
        }
    }
}

//! Authentication: token codec, password hashing and the session protocol.

pub mod password;
pub mod session;
pub mod token;

use thiserror::Error;

use crate::store::{Constraint, StoreError};
use token::TokenError;

pub use session::{Credentials, Registration, SessionAuthority, SessionGrant};
pub use token::{Claims, Purpose, SigningKey, TokenCodec};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already taken: {0}")]
    Conflict(Constraint),

    #[error("Account not found")]
    AccountNotFound,

    #[error(transparent)]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(constraint) => AuthError::Conflict(constraint),
            other => AuthError::Store(other),
        }
    }
}

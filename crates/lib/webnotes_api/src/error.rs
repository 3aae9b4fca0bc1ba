//! Application error types.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};
use webnotes_core::activity::ActivityError;
use webnotes_core::auth::AuthError;
use webnotes_core::notes::NoteError;
use webnotes_core::store::{Constraint, StoreError};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Message for anything a requester may not see.
pub const NOT_FOUND_MESSAGE: &str =
    "the requested resource was not found or you do not have access to it";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("the username or password is incorrect")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The merged not-found / not-visible outcome.
    pub fn not_found() -> Self {
        AppError::NotFound(NOT_FOUND_MESSAGE.into())
    }

    pub fn unauthorized() -> Self {
        AppError::Unauthorized("you must be logged in to access this resource".into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Unavailable(detail) => {
                error!(%detail, "store unavailable");
                "service temporarily unavailable, please try again later".to_string()
            }
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                "an error occurred, please try again later".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

fn conflict_message(constraint: Constraint) -> String {
    match constraint {
        Constraint::AccountUsername => {
            "username already in use, use a different username or log in"
        }
        Constraint::AccountEmail => "email already exists, use a different email or log in",
        Constraint::NoteSourceIdentifier => "a note with this source identifier already exists",
        Constraint::NoteSlug => "could not find a free slug for this note",
    }
    .to_string()
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(c) => AppError::Conflict(conflict_message(c)),
            StoreError::NotFound => AppError::not_found(),
            StoreError::Unavailable(detail) => AppError::Unavailable(detail),
            StoreError::Database(detail) => AppError::Internal(detail),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Token(e) => {
                debug!(kind = e.kind(), "rejected token");
                AppError::Unauthorized("invalid or expired session".into())
            }
            AuthError::AccountNotFound => AppError::unauthorized(),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Conflict(c) => AppError::Conflict(conflict_message(c)),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<NoteError> for AppError {
    fn from(e: NoteError) -> Self {
        let batch_context = match &e {
            NoteError::Batch { index, applied, .. } => Some((*index, *applied)),
            _ => None,
        };
        let mapped = match e.root() {
            NoteError::EmptyBatch => AppError::Validation(NoteError::EmptyBatch.to_string()),
            NoteError::Validation(msg) => AppError::Validation(msg.clone()),
            NoteError::Conflict(c) => AppError::Conflict(conflict_message(*c)),
            NoteError::NotFound => AppError::not_found(),
            NoteError::Store(StoreError::Unavailable(d)) => AppError::Unavailable(d.clone()),
            NoteError::Store(other) => AppError::Internal(other.to_string()),
            NoteError::Batch { .. } => AppError::Internal(e.to_string()),
        };
        match (batch_context, mapped) {
            (Some((index, applied)), AppError::Validation(msg)) => {
                AppError::Validation(format!("note {index}: {msg} ({applied} notes applied)"))
            }
            (Some((index, applied)), AppError::Conflict(msg)) => {
                AppError::Conflict(format!("note {index}: {msg} ({applied} notes applied)"))
            }
            (_, mapped) => mapped,
        }
    }
}

impl From<ActivityError> for AppError {
    fn from(e: ActivityError) -> Self {
        match e {
            ActivityError::Validation(msg) => AppError::Validation(msg),
            ActivityError::NotFound => {
                AppError::NotFound("no activities of the requested type found".into())
            }
            ActivityError::Store(e) => AppError::from(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(format!(
                "request body too large: {}",
                rejection.body_text()
            ));
        }
        AppError::Validation(format!(
            "parse request body for this request failed: {}",
            rejection.body_text()
        ))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => AppError::Validation(e.body_text()),
            other => AppError::Internal(other.body_text()),
        }
    }
}

/// Fallback for paths no route matches.
pub async fn route_not_found() -> AppError {
    AppError::not_found()
}

/// Fallback for a matched path without a handler for the method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

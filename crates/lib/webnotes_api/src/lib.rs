//! # webnotes_api
//!
//! HTTP API library for Webnotes.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use webnotes_core::auth::{SessionAuthority, TokenCodec};
use webnotes_core::store::Store;

use crate::config::ApiConfig;
use crate::handlers::{accounts, activity, notes, profile};

/// Prefix every route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Accounts, notes and activity.
    pub store: Arc<dyn Store>,
    /// Session protocol over the configured signing key.
    pub sessions: Arc<SessionAuthority>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ApiConfig) -> Self {
        let codec = TokenCodec::new(&config.signing_key);
        let sessions = SessionAuthority::new(codec, config.default_avatar_url.clone());
        Self {
            store,
            sessions: Arc::new(sessions),
            config,
        }
    }
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let permissive = || {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };
    let Some(origin) = config.frontend_origin.as_deref() else {
        return permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            warn!(%origin, error = %e, "ignoring unusable FRONTEND_ORIGIN");
            permissive()
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Public routes (no session needed)
    let public = Router::new()
        .route("/accounts/exchangeAuthCode", post(accounts::exchange_auth_code))
        .route("/accounts/usernameExists", get(accounts::username_exists))
        .route("/accounts/login", post(accounts::login))
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/logout", post(accounts::logout))
        .route("/profile/{username}", get(profile::public_profile));

    // Routes serving owners and the public alike
    let optional = Router::new()
        .route("/notes/list/{username}", get(notes::list_deployed))
        // `{key}` is a note id, or a username when followed by a slug.
        .route("/notes/{key}", get(notes::note_by_id))
        .route("/notes/{key}/{slug}", get(notes::note_by_slug))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_session,
        ));

    // Protected routes (session required)
    let protected = Router::new()
        .route("/accounts/me", get(accounts::me))
        .route("/accounts/authcode", get(accounts::auth_code))
        .route("/accounts/authorize", get(accounts::authorize))
        .route(
            "/notes/list",
            get(notes::list_own)
                .post(notes::sync)
                .layer(DefaultBodyLimit::max(state.config.sync_body_limit)),
        )
        .route(
            "/notes/deploy/{id}",
            post(notes::deploy).delete(notes::undeploy),
        )
        .route("/notes/count", get(notes::count))
        .route("/profile", get(profile::my_profile))
        .route("/profile/edit/name", patch(profile::edit_name))
        .route("/profile/edit/description", patch(profile::edit_description))
        .route("/activity", get(activity::list))
        .route("/activity/{kind}", get(activity::last_of))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let api = Router::new()
        .merge(public)
        .merge(optional)
        .merge(protected)
        .method_not_allowed_fallback(error::method_not_allowed);

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(error::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

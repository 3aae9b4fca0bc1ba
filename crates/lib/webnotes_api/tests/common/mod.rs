//! Shared harness: the full router over an in-memory store, driven with `oneshot`.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use webnotes_api::config::ApiConfig;
use webnotes_api::{AppState, router};
use webnotes_core::auth::SigningKey;
use webnotes_core::models::{
    Account, Activity, ActivityKind, NewAccount, NewActivity, NewNote, Note, NoteKey,
    NoteSummary,
};
use webnotes_core::store::{
    AccountStore, ActivityStore, MemoryStore, NoteStore, Store, StoreError,
};

pub const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub fn signing_key() -> SigningKey {
    SigningKey::from_hex(KEY_HEX).unwrap()
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl Response {
    /// Value of the `session_token` cookie set by this response.
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next().map(str::to_string))
            .and_then(|pair| pair.strip_prefix("session_token=").map(str::to_string))
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::new(signing_key()))
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config);
        Self {
            router: router(state.clone()),
            store,
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("session_token={token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .expect("request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        Response {
            status,
            headers,
            json,
        }
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response {
        self.request(Method::GET, uri, session, None).await
    }

    pub async fn post(&self, uri: &str, session: Option<&str>, body: Value) -> Response {
        self.request(Method::POST, uri, session, Some(body)).await
    }

    /// Register `username` and return its browser session token.
    pub async fn register(&self, username: &str) -> String {
        let resp = self
            .post(
                "/api/v1/accounts/register",
                None,
                serde_json::json!({
                    "email": format!("{username}@x.com"),
                    "username": username,
                    "name": username,
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.json);
        resp.session_cookie().expect("session cookie")
    }
}

/// Store whose every call fails as unreachable.
pub struct DownStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
}

#[async_trait]
impl AccountStore for DownStore {
    async fn insert_account(&self, _: NewAccount) -> Result<Account, StoreError> {
        down()
    }
    async fn account_by_id(&self, _: Uuid) -> Result<Option<Account>, StoreError> {
        down()
    }
    async fn account_by_username(&self, _: &str) -> Result<Option<Account>, StoreError> {
        down()
    }
    async fn account_by_email(&self, _: &str) -> Result<Option<Account>, StoreError> {
        down()
    }
    async fn username_exists(&self, _: &str) -> Result<bool, StoreError> {
        down()
    }
    async fn update_account_name(&self, _: Uuid, _: &str) -> Result<(), StoreError> {
        down()
    }
    async fn update_account_description(&self, _: Uuid, _: &str) -> Result<(), StoreError> {
        down()
    }
}

#[async_trait]
impl NoteStore for DownStore {
    async fn note_keys(&self, _: Uuid) -> Result<HashSet<NoteKey>, StoreError> {
        down()
    }
    async fn insert_note(&self, _: &NewNote) -> Result<Note, StoreError> {
        down()
    }
    async fn update_note(&self, _: &NewNote) -> Result<bool, StoreError> {
        down()
    }
    async fn note_by_id(&self, _: Uuid) -> Result<Option<Note>, StoreError> {
        down()
    }
    async fn note_by_slug(&self, _: Uuid, _: &str) -> Result<Option<Note>, StoreError> {
        down()
    }
    async fn list_notes(&self, _: Uuid, _: bool) -> Result<Vec<NoteSummary>, StoreError> {
        down()
    }
    async fn count_notes(&self, _: Uuid) -> Result<i64, StoreError> {
        down()
    }
    async fn set_deployed(&self, _: Uuid, _: Uuid, _: bool) -> Result<bool, StoreError> {
        down()
    }
}

#[async_trait]
impl ActivityStore for DownStore {
    async fn insert_activity(&self, _: NewActivity) -> Result<Activity, StoreError> {
        down()
    }
    async fn list_activities(
        &self,
        _: Uuid,
        _: Option<DateTime<Utc>>,
        _: i64,
        _: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        down()
    }
    async fn last_activity(
        &self,
        _: Uuid,
        _: ActivityKind,
    ) -> Result<Option<Activity>, StoreError> {
        down()
    }
}

/// Router over a store that is unreachable.
pub fn down_router() -> Router {
    let store: Arc<dyn Store> = Arc::new(DownStore);
    router(AppState::new(store, ApiConfig::new(signing_key())))
}

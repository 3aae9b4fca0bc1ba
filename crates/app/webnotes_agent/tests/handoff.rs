//! End-to-end: browser hand-off and sync cycles against an in-process server.

use std::fs;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use webnotes_agent::client::{ApiClient, SyncReport};
use webnotes_agent::credentials::CredentialStore;
use webnotes_agent::source::DirectorySource;
use webnotes_agent::worker::SyncWorker;
use webnotes_api::config::ApiConfig;
use webnotes_api::{AppState, router};
use webnotes_core::auth::SigningKey;
use webnotes_core::store::MemoryStore;

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Serve the API on an ephemeral port; returns its `/api/v1` base URL.
async fn spawn_server() -> String {
    let store = Arc::new(MemoryStore::new());
    let config = ApiConfig::new(SigningKey::from_hex(KEY_HEX).unwrap());
    let app = router(AppState::new(store, config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}/api/v1")
}

/// Register `alice` and return her browser session token.
async fn browser_session(base: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{base}/accounts/register"))
        .json(&json!({
            "email": "alice@x.com",
            "username": "alice",
            "name": "Alice",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("session_token="))
        .unwrap()
        .to_string()
}

async fn own_notes(base: &str, token: &str) -> Vec<Value> {
    let body: Value = reqwest::Client::new()
        .get(format!("{base}/notes/list"))
        .header(COOKIE, format!("session_token={token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["notes"].as_array().unwrap().clone()
}

#[tokio::test]
async fn authorize_then_sync_directory() {
    let base = spawn_server().await;
    let browser_token = browser_session(&base).await;
    let client = ApiClient::new(&base).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialStore::new(dir.path().join("session_token"));

    // The "browser" follows the authorize redirect back to the agent.
    let (url_tx, url_rx) = oneshot::channel::<String>();
    let browser = async {
        let url = url_rx.await.unwrap();
        let resp = reqwest::Client::new()
            .get(url)
            .header(COOKIE, format!("session_token={browser_token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    };
    let (authorized, ()) = tokio::join!(
        webnotes_agent::authorize(&client, &credentials, |url| {
            url_tx.send(url.to_string()).unwrap();
        }),
        browser
    );
    authorized.unwrap();

    let agent_token = credentials.load().unwrap().unwrap();
    assert_ne!(agent_token, browser_token);

    let notes_dir = dir.path().join("notes");
    fs::create_dir_all(&notes_dir).unwrap();
    fs::write(notes_dir.join("hello.md"), "# Hello World\nfirst").unwrap();
    fs::write(notes_dir.join("todo.txt"), "water plants").unwrap();

    let worker = SyncWorker::new(
        client.clone(),
        agent_token.clone(),
        Arc::new(DirectorySource::new(&notes_dir)),
    );
    let first = worker.sync_once().await.unwrap();
    assert_eq!(
        first,
        Some(SyncReport {
            inserted: 2,
            updated: 0
        })
    );

    fs::write(notes_dir.join("hello.md"), "# Hello World Edited\nsecond").unwrap();
    let second = worker.sync_once().await.unwrap();
    assert_eq!(
        second,
        Some(SyncReport {
            inserted: 0,
            updated: 2
        })
    );

    let notes = own_notes(&base, &agent_token).await;
    assert_eq!(notes.len(), 2);
    let hello = notes
        .iter()
        .find(|n| n["source_identifier"] == "hello.md")
        .unwrap();
    assert_eq!(hello["title"], "Hello World Edited");
    assert_eq!(hello["source"], "directory");
}

#[tokio::test]
async fn unauthorized_push_is_reported() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "a").unwrap();

    let worker = SyncWorker::new(
        client,
        "not-a-token".into(),
        Arc::new(DirectorySource::new(dir.path())),
    );
    let err = worker.sync_once().await.unwrap_err();
    assert!(err.is_unauthorized());
}

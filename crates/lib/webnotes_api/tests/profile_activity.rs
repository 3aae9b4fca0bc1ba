//! Integration tests — profiles and the activity trail.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

async fn connect_client(app: &TestApp, token: &str) {
    let code = app.get("/api/v1/accounts/authcode", Some(token)).await;
    let code = code.json["code"].as_str().unwrap().to_string();
    let resp = app
        .post(
            "/api/v1/accounts/exchangeAuthCode",
            None,
            json!({ "code": code }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn own_profile_hides_private_fields() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    let resp = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["error"], json!(null));
    assert_eq!(resp.json["username"], "alice");
    assert_eq!(resp.json["has_connected_client"], false);
    assert!(resp.json.get("email").is_none());
    assert!(resp.json.get("password_hash").is_none());
    assert!(!resp.json["avatar_url"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn public_profile_reports_connected_client() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    connect_client(&app, &token).await;

    let resp = app.get("/api/v1/profile/alice", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["has_connected_client"], true);

    let missing = app.get("/api/v1/profile/nobody", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn name_and_description_edits_are_visible() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    let name = app
        .request(
            Method::PATCH,
            "/api/v1/profile/edit/name",
            Some(&token),
            Some(json!({ "name": "  Alice Liddell " })),
        )
        .await;
    assert_eq!(name.status, StatusCode::OK);
    let description = app
        .request(
            Method::PATCH,
            "/api/v1/profile/edit/description",
            Some(&token),
            Some(json!({ "description": "down the rabbit hole" })),
        )
        .await;
    assert_eq!(description.status, StatusCode::OK);

    let profile = app.get("/api/v1/profile/alice", None).await;
    assert_eq!(profile.json["name"], "Alice Liddell");
    assert_eq!(profile.json["description"], "down the rabbit hole");
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    let resp = app
        .request(
            Method::PATCH,
            "/api/v1/profile/edit/name",
            Some(&token),
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_edits_require_session() {
    let app = TestApp::new();
    let resp = app
        .request(
            Method::PATCH,
            "/api/v1/profile/edit/name",
            None,
            Some(json!({ "name": "Mallory" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn activity_lists_newest_first() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    app.post(
        "/api/v1/accounts/login",
        None,
        json!({ "username": "alice", "password": "password123" }),
    )
    .await;

    let resp = app.get("/api/v1/activity", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let kinds: Vec<_> = resp.json["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["activity_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, ["new_login", "account_created"]);

    let page = app.get("/api/v1/activity?limit=1", Some(&token)).await;
    assert_eq!(page.json["activities"].as_array().unwrap().len(), 1);
    let rest = app
        .get("/api/v1/activity?offset=1&limit=5", Some(&token))
        .await;
    assert_eq!(
        rest.json["activities"][0]["activity_type"],
        "account_created"
    );
}

#[tokio::test]
async fn activity_is_private_to_its_owner() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    connect_client(&app, &alice).await;

    let resp = app
        .get("/api/v1/activity/client_authorized", Some(&bob))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json["error"], "no activities of the requested type found");

    let own = app
        .get("/api/v1/activity/client_authorized", Some(&alice))
        .await;
    assert_eq!(own.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_activity_queries_are_rejected() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    for uri in [
        "/api/v1/activity?offset=-1",
        "/api/v1/activity?limit=-5",
        "/api/v1/activity?load_time=-1",
        "/api/v1/activity?limit=ten",
        "/api/v1/activity/not_a_kind",
    ] {
        let resp = app.get(uri, Some(&token)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn load_time_excludes_later_records() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    let resp = app
        .get("/api/v1/activity?load_time=1000", Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json["activities"].as_array().unwrap().is_empty());
}

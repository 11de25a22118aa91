//! User API Tests

use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_current_user_includes_private_fields() {
    let app = TestApp::new().await;
    let (user_id, token) = app.sign_in("Ada Lovelace").await;

    let response = app.server.get("/api/v1/users/@me").authorization_bearer(&token).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], user_id.as_str());
    assert!(body["email"].is_string());
    assert_eq!(body["settings"]["theme"], "system");
}

#[tokio::test]
async fn test_update_profile_and_settings() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_in("Ada").await;

    let response = app
        .server
        .patch("/api/v1/users/@me")
        .authorization_bearer(&token)
        .json(&json!({ "display_name": "Countess", "biography": "Analyst" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["display_name"], "Countess");
    assert_eq!(body["biography"], "Analyst");

    let response = app
        .server
        .patch("/api/v1/users/@me/settings")
        .authorization_bearer(&token)
        .json(&json!({ "theme": "dark" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["settings"]["theme"], "dark");
}

#[tokio::test]
async fn test_blank_display_name_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_in("Ada").await;

    let response = app
        .server
        .patch("/api/v1/users/@me")
        .authorization_bearer(&token)
        .json(&json!({ "display_name": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_excludes_the_caller_and_private_fields() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_in("Grace Hopper").await;
    let (other_id, _) = app.sign_in("Grace Kelly").await;

    let response = app
        .server
        .get("/api/v1/users/search")
        .authorization_bearer(&token)
        .add_query_param("q", "grace")
        .await;

    response.assert_status_ok();
    let body: Vec<Value> = response.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["id"], other_id.as_str());
    assert!(body[0].get("email").is_none());
}

#[tokio::test]
async fn test_photo_upload_stores_blob_and_sets_url() {
    let app = TestApp::new().await;
    let (user_id, token) = app.sign_in("Ada").await;

    let response = app
        .server
        .put("/api/v1/users/@me/photo")
        .authorization_bearer(&token)
        .bytes(Bytes::from_static(b"\x89PNG fake image"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let url = body["photo_url"].as_str().unwrap();
    assert!(url.starts_with(&format!("http://localhost/uploads/users/{}/profile?v=", user_id)));
}

#[tokio::test]
async fn test_empty_photo_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_in("Ada").await;

    let response = app
        .server
        .put("/api/v1/users/@me/photo")
        .authorization_bearer(&token)
        .bytes(Bytes::new())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

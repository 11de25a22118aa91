//! Authentication API Tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{id_token, TestApp};

#[tokio::test]
async fn test_first_sign_in_creates_the_user() {
    let app = TestApp::new().await;
    let token = id_token(&app.settings, "subject-1", "ada@example.com", Some("Ada"));

    let response = app
        .server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "id_token": token }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["is_new_user"], true);
    assert_eq!(body["user"]["id"], "subject-1");
    assert_eq!(body["user"]["display_name"], "Ada");
    assert_eq!(body["token"]["token_type"], "Bearer");
}

#[tokio::test]
async fn test_second_sign_in_returns_existing_user() {
    let app = TestApp::new().await;
    let token = id_token(&app.settings, "subject-2", "grace@example.com", None);
    app.server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "id_token": token }))
        .await;

    let response = app
        .server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "id_token": token }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["is_new_user"], false);
    assert_eq!(body["user"]["display_name"], "grace");
}

#[tokio::test]
async fn test_forged_id_token_is_unauthorized() {
    let app = TestApp::new().await;
    let mut settings = app.settings.clone();
    settings.identity.secret = "some-other-secret-of-sufficient-length".into();
    let token = id_token(&settings, "subject-3", "eve@example.com", None);

    let response = app
        .server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "id_token": token }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_id_token_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "id_token": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_route_requires_bearer_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/users/@me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

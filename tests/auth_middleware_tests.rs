// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication middleware outcomes and route-level policy.

use axum::http::StatusCode;
use elearning::cache::KvStore;
use elearning::config::Config;
use elearning::models::Role;
use elearning::services::tokens::session_key;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

mod common;
use common::{create_test_app, login, seed_user, Call};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn access_token(sub: &str, iat: u64, exp: u64) -> String {
    let secret = Config::test_default().access_token_secret;
    encode(
        &Header::default(),
        &json!({"sub": sub, "iat": iat, "exp": exp}),
        &EncodingKey::from_secret(&secret),
    )
    .unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = create_test_app();

    let response = Call::get("/api/v1/me").send(&app.router).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), Some("unauthenticated"));
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let app = create_test_app();

    let response = Call::get("/api/v1/me")
        .bearer("not.a.jwt")
        .send(&app.router)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), Some("invalid_token"));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_invalid() {
    let app = create_test_app();
    let user = seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let token = encode(
        &Header::default(),
        &json!({"sub": user.id, "iat": now(), "exp": now() + 300}),
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let response = Call::get("/api/v1/me").bearer(&token).send(&app.router).await;

    assert_eq!(response.code(), Some("invalid_token"));
}

#[tokio::test]
async fn test_expired_token_is_distinguished() {
    let app = create_test_app();
    let user = seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    login(&app, "ada@example.com").await;

    let expired = access_token(&user.id, now() - 600, now() - 10);
    let response = Call::get("/api/v1/me")
        .cookie("access_token", &expired)
        .send(&app.router)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), Some("token_expired"));
}

#[tokio::test]
async fn test_valid_token_without_session() {
    let app = create_test_app();
    let user = seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let session = login(&app, "ada@example.com").await;

    app.kv.delete(&session_key(&user.id)).await.unwrap();

    let response = Call::get("/api/v1/me")
        .bearer(&session.access_token)
        .send(&app.router)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), Some("session_not_found"));
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let app = create_test_app();
    seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let session = login(&app, "ada@example.com").await;

    let response = Call::get("/api/v1/me")
        .bearer(&session.access_token)
        .send(&app.router)
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_takes_precedence_over_header() {
    let app = create_test_app();
    seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let session = login(&app, "ada@example.com").await;

    let response = Call::get("/api/v1/me")
        .cookie("access_token", &session.access_token)
        .bearer("garbage")
        .send(&app.router)
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_role_forbidden_on_admin_routes() {
    let app = create_test_app();
    seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let session = login(&app, "ada@example.com").await;

    for call in [
        Call::get("/api/v1/get-users"),
        Call::get("/api/v1/get-admin-courses"),
        Call::get("/api/v1/get-all-notifications"),
        Call::delete("/api/v1/delete-course/c1"),
    ] {
        let response = call.bearer(&session.access_token).send(&app.router).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.code(), Some("forbidden"));
    }
}

#[tokio::test]
async fn test_admin_routes_without_token_are_unauthenticated_not_forbidden() {
    let app = create_test_app();

    let response = Call::get("/api/v1/get-users").send(&app.router).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), Some("unauthenticated"));
}

#[tokio::test]
async fn test_role_change_applies_on_next_request() {
    let app = create_test_app();
    seed_user(&app, "Root", "root@example.com", Role::Admin).await;
    seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let admin = login(&app, "root@example.com").await;
    let user = login(&app, "ada@example.com").await;

    let before = Call::get("/api/v1/get-users")
        .bearer(&user.access_token)
        .send(&app.router)
        .await;
    assert_eq!(before.status, StatusCode::FORBIDDEN);

    let promote = Call::put("/api/v1/update-user-role")
        .bearer(&admin.access_token)
        .json(json!({"email": "ada@example.com", "role": "admin"}))
        .send(&app.router)
        .await;
    assert_eq!(promote.status, StatusCode::OK, "{}", promote.body);

    // Same access token, new role
    let after = Call::get("/api/v1/get-users")
        .bearer(&user.access_token)
        .send(&app.router)
        .await;
    assert_eq!(after.status, StatusCode::OK);
    assert_eq!(after.body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_update_rewrites_session() {
    let app = create_test_app();
    seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let session = login(&app, "ada@example.com").await;

    let response = Call::put("/api/v1/update-user-info")
        .bearer(&session.access_token)
        .json(json!({"name": "Ada Lovelace"}))
        .send(&app.router)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = Call::get("/api/v1/me")
        .bearer(&session.access_token)
        .send(&app.router)
        .await;
    assert_eq!(me.body["user"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_deleted_user_loses_session() {
    let app = create_test_app();
    seed_user(&app, "Root", "root@example.com", Role::Admin).await;
    let user = seed_user(&app, "Ada", "ada@example.com", Role::User).await;
    let admin = login(&app, "root@example.com").await;
    let session = login(&app, "ada@example.com").await;

    let response = Call::delete(&format!("/api/v1/delete-user/{}", user.id))
        .bearer(&admin.access_token)
        .send(&app.router)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = Call::get("/api/v1/me")
        .bearer(&session.access_token)
        .send(&app.router)
        .await;
    assert_eq!(me.code(), Some("session_not_found"));
}

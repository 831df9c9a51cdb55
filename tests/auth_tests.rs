mod common;

use axum::http::StatusCode;
use common::{PASSWORD, spawn_app};
use serde_json::json;

#[tokio::test]
async fn test_register_token_me_roundtrip() {
    let app = spawn_app().await;

    let (status, body) = app.register("amara").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["username"], "amara");
    assert_eq!(body["user"]["email"], "amara@example.com");
    assert_eq!(body["user"]["first_name"], "Test");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let (status, tokens) = app
        .post_json(
            "/api/users/token/",
            json!({ "username": "amara", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = tokens["access"].as_str().unwrap();
    assert!(tokens["refresh"].is_string());

    let (status, me) = app.get("/api/users/me/", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "amara");
    assert_eq!(me["id"], body["user"]["id"]);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let app = spawn_app().await;
    app.signup("kofi").await;

    let (status, body) = app.register("kofi").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["username"][0],
        "A user with that username already exists."
    );
    assert_eq!(app.state.store.user_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_reports_every_field_problem() {
    let app = spawn_app().await;

    let (status, body) = app
        .post_json(
            "/api/users/register/",
            json!({
                "username": "bad name!",
                "email": "not-an-email",
                "password": "1234",
                "password2": "4321",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
    assert_eq!(body["email"][0], "Enter a valid email address.");
    assert!(
        body["password"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m == "This password is entirely numeric.")
    );
    assert_eq!(body["password2"][0], "Password fields didn't match.");
    assert_eq!(app.state.store.user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_token_rejects_bad_credentials() {
    let app = spawn_app().await;
    app.signup("lin").await;

    for payload in [
        json!({ "username": "lin", "password": "wrong-password" }),
        json!({ "username": "nobody", "password": PASSWORD }),
        json!({}),
    ] {
        let (status, body) = app.post_json("/api/users/token/", payload).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["error"],
            "No active account found with the given credentials"
        );
    }
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = spawn_app().await;

    for uri in ["/api/users/me/", "/api/analysis/history/", "/api/metrics"] {
        let (status, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} without token");

        let (status, body) = app.get(uri, Some("garbage.token.value")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with garbage token");
        assert_eq!(body["error"], "Token is invalid or expired");
    }

    let (status, _) = app
        .upload("", "image", "leaf.png", &common::png_bytes(8, 8))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let app = spawn_app().await;
    let (_, access, refresh) = app.signup("noor").await;

    let (status, body) = app
        .post_json("/api/users/token/refresh/", json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["access"].as_str().unwrap();

    let (status, me) = app.get("/api/users/me/", Some(new_access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "noor");

    // Access and refresh tokens are not interchangeable
    let (status, _) = app
        .post_json("/api/users/token/refresh/", json!({ "refresh": access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/users/me/", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = spawn_app().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

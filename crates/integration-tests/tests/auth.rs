//! Integration tests for registration, login and profile endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p boutique-storefront)
//!
//! Run with: cargo test -p boutique-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use boutique_integration_tests::{PASSWORD, TestContext, unique_email};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_returns_token_and_profile() {
    let ctx = TestContext::new();
    let account = ctx.register().await;

    assert_eq!(account.user["email"], account.email.as_str());
    assert_eq!(account.user["firstName"], "Integration");
    assert_eq!(account.user["role"], "user");
    assert!(account.user.get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    let account = ctx.register().await;

    let response = ctx
        .client
        .post(ctx.url("/auth/register"))
        .json(&json!({
            "email": account.email,
            "password": PASSWORD,
            "firstName": "Second",
            "lastName": "Attempt",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_requires_email_and_password() {
    let ctx = TestContext::new();

    let response = ctx
        .client
        .post(ctx.url("/auth/register"))
        .json(&json!({ "email": unique_email(), "firstName": "No", "lastName": "Password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Email and password are required");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_login_with_correct_and_wrong_password() {
    let ctx = TestContext::new();
    let account = ctx.register().await;

    let response = ctx
        .client
        .post(ctx.url("/auth/login"))
        .json(&json!({ "email": account.email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], account.email.as_str());

    let response = ctx
        .client
        .post(ctx.url("/auth/login"))
        .json(&json!({ "email": account.email, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_profile_shapes() {
    let ctx = TestContext::new();
    let account = ctx.register().await;

    let profile: Value = ctx
        .authed(&account, Method::GET, "/auth/profile")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["email"], account.email.as_str());

    let envelope: Value = ctx
        .authed(&account, Method::GET, "/auth/google/profile")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(envelope["user"]["email"], account.email.as_str());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_profile_names() {
    let ctx = TestContext::new();
    let account = ctx.register().await;

    let response = ctx
        .authed(&account, Method::PUT, "/auth/profile")
        .json(&json!({ "firstName": "Renamed" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["firstName"], "Renamed");
    assert_eq!(body["user"]["lastName"], "Tester");
}

//! Integration tests for the client cart session against a live storefront.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p boutique-storefront)
//!
//! Run with: cargo test -p boutique-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use boutique_client::{
    AuthClient, CartSession, ClientConfig, FileStore, HttpCartClient, LoginOutcome,
    RegisterRequest, SessionMode,
};
use boutique_core::{Price, ProductId};
use boutique_integration_tests::{PASSWORD, api_url, unique_email};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    config: ClientConfig,
    auth: AuthClient,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = ClientConfig::for_api(&api_url()).unwrap();
        config.state_file = dir.path().join("state.json");
        let auth = AuthClient::new(&config).unwrap();
        Self {
            _dir: dir,
            config,
            auth,
        }
    }

    /// A session restored from this harness's state file.
    async fn session(&self) -> CartSession {
        let remote = Arc::new(HttpCartClient::new(&self.config).unwrap());
        let store = Arc::new(FileStore::new(&self.config.state_file));
        CartSession::restore(remote, store).await.unwrap()
    }

    async fn register(&self) -> (String, secrecy::SecretString) {
        let email = unique_email();
        let response = self
            .auth
            .register(&RegisterRequest {
                email: email.clone(),
                password: PASSWORD.to_string(),
                first_name: "Session".to_string(),
                last_name: "Tester".to_string(),
            })
            .await
            .unwrap();
        (email, response.token)
    }
}

fn price(s: &str) -> Price {
    Price::parse(s).unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_guest_cart_merges_into_account_on_login() {
    let harness = Harness::new();
    let (email, _) = harness.register().await;

    // Put something in the account cart from another device.
    let other = harness.session().await;
    let token = harness.auth.login(&email, PASSWORD).await.unwrap().token;
    other.complete_login(token).await.unwrap();
    other.add_item("mug", "Mug", price("12.50"), 1, None).await.unwrap();
    other.logout().await.unwrap();

    let session = harness.session().await;
    assert_eq!(session.mode().await, SessionMode::Anonymous);
    session.add_item("mug", "Mug", price("12.50"), 2, None).await.unwrap();
    session.add_item("tea", "Tea", price("4.00"), 1, None).await.unwrap();

    let token = harness.auth.login(&email, PASSWORD).await.unwrap().token;
    let outcome = session.complete_login(token).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Synced { merged_lines: 2, .. }));
    let items = session.refresh().await.unwrap();
    let mug = items
        .iter()
        .find(|i| i.product_id == ProductId::parse("mug").unwrap())
        .unwrap();
    assert_eq!(mug.quantity.get(), 3);
    assert_eq!(items.len(), 2);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_signed_in_session_survives_restart() {
    let harness = Harness::new();
    let (_, token) = harness.register().await;

    let session = harness.session().await;
    session.complete_login(token).await.unwrap();
    session.add_item("candle", "Candle", price("18.75"), 2, None).await.unwrap();
    drop(session);

    let restored = harness.session().await;
    assert_eq!(restored.mode().await, SessionMode::Authenticated);
    let items = restored.refresh().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity.get(), 2);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_logout_leaves_an_empty_guest_cart() {
    let harness = Harness::new();
    let (_, token) = harness.register().await;

    let session = harness.session().await;
    session.complete_login(token).await.unwrap();
    session.add_item("mug", "Mug", price("12.50"), 1, None).await.unwrap();

    let outcome = session.logout().await.unwrap();
    assert!(outcome.saved);
    assert_eq!(session.mode().await, SessionMode::Anonymous);
    assert!(session.items().await.is_empty());

    let restored = harness.session().await;
    assert!(restored.items().await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_through_session() {
    let harness = Harness::new();
    let (_, token) = harness.register().await;

    let session = harness.session().await;
    session.add_item("tote", "Tote", price("24.00"), 1, None).await.unwrap();
    session.complete_login(token).await.unwrap();

    let order = session.checkout().await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert!(session.refresh().await.unwrap().is_empty());
}

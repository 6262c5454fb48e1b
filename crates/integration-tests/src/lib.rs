//! Integration tests for Boutique.
//!
//! These tests drive a running storefront over HTTP, so they are ignored by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! docker compose up -d postgres
//! cargo run -p boutique-cli -- migrate
//!
//! # Start the storefront, then run the ignored tests
//! cargo run -p boutique-storefront &
//! cargo test -p boutique-integration-tests -- --ignored
//! ```
//!
//! `BOUTIQUE_API_URL` points the tests at a server other than
//! `http://localhost:3001/api`.
//!
//! # Test Files
//!
//! - `auth` - Registration, login and profile endpoints
//! - `cart` - Cart endpoints and guest cart merge
//! - `orders` - Checkout and order history
//! - `session` - The client cart session against a live server

#![allow(clippy::missing_panics_doc)]

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the storefront API, without a trailing slash.
#[must_use]
pub fn api_url() -> String {
    std::env::var("BOUTIQUE_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001/api".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@boutique.test", Uuid::new_v4().simple())
}

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A signed-up test account.
pub struct TestAccount {
    pub email: String,
    pub token: String,
    pub user: Value,
}

/// Shared HTTP client and helpers for one test.
pub struct TestContext {
    pub client: Client,
    pub api_url: String,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        // Each context gets its own rate limit bucket on the server.
        let id = Uuid::new_v4();
        let [a, b, c, ..] = *id.as_bytes();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).expect("valid header value"),
        );

        Self {
            client: Client::builder()
                .default_headers(headers)
                .build()
                .expect("Failed to build HTTP client"),
            api_url: api_url(),
        }
    }

    /// Full URL for an API path such as `/cart/items`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Register a fresh account.
    pub async fn register(&self) -> TestAccount {
        let email = unique_email();
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "firstName": "Integration",
                "lastName": "Tester",
            }))
            .send()
            .await
            .expect("Failed to send register request");

        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid register response");

        TestAccount {
            email,
            token: body["token"].as_str().expect("token missing").to_string(),
            user: body["user"].clone(),
        }
    }

    /// A request builder carrying `account`'s bearer token.
    #[must_use]
    pub fn authed(&self, account: &TestAccount, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&account.token)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A cart line body for product `id`.
#[must_use]
pub fn line(id: &str, price: f64, quantity: u32) -> Value {
    json!({
        "productId": id,
        "name": format!("Product {id}"),
        "price": price,
        "quantity": quantity,
    })
}

/// Quantity of `product_id` in a cart response, if present.
#[must_use]
pub fn quantity_of(cart: &Value, product_id: &str) -> Option<u64> {
    cart["items"]
        .as_array()?
        .iter()
        .find(|item| item["productId"] == product_id)
        .and_then(|item| item["quantity"].as_u64())
}

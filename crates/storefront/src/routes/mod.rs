//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness check
//! GET    /health/ready                  - Readiness check (database ping)
//!
//! # Auth (login/register rate limited)
//! POST   /api/auth/register             - Create a password account
//! POST   /api/auth/login                - Password sign-in
//! GET    /api/auth/profile              - Signed-in account
//! PUT    /api/auth/profile              - Change email or names
//!
//! # Google sign-in
//! GET    /api/auth/google/login         - Redirect to Google
//! GET    /api/auth/google/callback      - Finish sign-in, redirect with token
//! GET    /api/auth/google/profile       - Signed-in account as `{ user }`
//!
//! # Products (writes require admin)
//! GET    /api/products                  - Catalog, newest first
//! POST   /api/products                  - Add a product
//! GET    /api/products/{id}             - One product
//! PUT    /api/products/{id}             - Replace a product
//! DELETE /api/products/{id}             - Remove a product
//!
//! # Cart (requires auth)
//! GET    /api/cart                      - Fetch (creates on first access)
//! DELETE /api/cart                      - Clear
//! POST   /api/cart/items                - Add a line
//! PUT    /api/cart/items/{productId}    - Set a line's quantity
//! DELETE /api/cart/items/{productId}    - Remove a line
//! POST   /api/cart/merge                - Merge a guest cart
//!
//! # Orders (requires auth)
//! GET    /api/orders                    - Order history
//! POST   /api/orders                    - Checkout
//! DELETE /api/orders                    - Clear order history
//! ```

pub mod auth;
pub mod cart;
pub mod google;
pub mod health;
pub mod orders;
pub mod products;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::{AppError, Result};
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Decode a JSON body, turning shape errors into a 400 with the serde message.
pub(crate) fn decode_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let password = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route_layer(auth_rate_limiter());

    Router::new()
        .merge(password)
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/google/login", get(google::login))
        .route("/google/callback", get(google::callback))
        .route("/google/profile", get(google::profile))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route_layer(api_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::set_quantity).delete(cart::remove_item),
        )
        .route("/merge", post(cart::merge))
        .route_layer(api_rate_limiter())
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(orders::index)
                .post(orders::checkout)
                .delete(orders::clear),
        )
        .route_layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}

/// CORS for the browser client, if an origin is configured.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Ignoring invalid CORS origin");
            layer
        }
        None => layer,
    }
}

/// The full application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config().cors_origin.as_deref());

    routes()
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

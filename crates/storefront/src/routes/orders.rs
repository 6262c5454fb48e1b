//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};
use tracing::instrument;

use boutique_core::Order;

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The caller's order history, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Turn the caller's cart into an order and empty the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .checkout(user.id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Cart is empty".to_string()))?;

    tracing::info!(order_id = %order.id, total = %order.total, lines = order.items.len(), "Order placed");
    add_breadcrumb("orders", "Order placed", None);

    Ok((StatusCode::CREATED, Json(order)))
}

/// Delete the caller's order history.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let removed = OrderRepository::new(state.pool())
        .clear_for_user(user.id)
        .await?;
    tracing::info!(removed, "Order history cleared");

    Ok(Json(json!({ "message": "Order history cleared successfully" })))
}

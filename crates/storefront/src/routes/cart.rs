//! Cart route handlers.
//!
//! Every handler works on the caller's own cart. Mutations go through
//! [`CartRepository::edit`], which holds the cart row lock for the whole
//! read-modify-write, and respond with the authoritative line list.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use boutique_core::{Cart, LineItem, ProductId, cart};

use super::decode_body;
use crate::db::RepositoryError;
use crate::db::carts::{CartRepository, IfMissing};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Cart contents as returned by every cart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub updated_at: DateTime<Utc>,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            items: cart.items,
            updated_at: cart.updated_at,
        }
    }
}

/// `PUT /cart/items/{productId}` body. Kept loose so bad values get a 400.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    #[serde(default)]
    pub quantity: Value,
}

/// `POST /cart/merge` body.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    #[serde(default)]
    pub items: Value,
}

fn cart_not_found(err: AppError) -> AppError {
    match err {
        AppError::Database(RepositoryError::NotFound) => {
            AppError::NotFound("Cart not found".to_string())
        }
        other => other,
    }
}

fn item_not_found() -> AppError {
    AppError::NotFound("Item not found in cart".to_string())
}

/// A product ID from the path. Blank IDs never match a line.
fn path_product_id(product_id: &str) -> Result<ProductId> {
    ProductId::parse(product_id).map_err(|_| item_not_found())
}

/// A non-negative whole number of units.
fn parse_quantity(value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| AppError::BadRequest("Invalid quantity".to_string()))
}

/// Validate every incoming line, reporting the first bad one.
fn parse_lines(value: Value) -> Result<Vec<LineItem>> {
    let Value::Array(raw) = value else {
        return Err(AppError::BadRequest("Invalid items format".to_string()));
    };

    raw.into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<LineItem>(item)
                .map_err(|e| AppError::BadRequest(format!("Invalid item at index {index}: {e}")))
        })
        .collect()
}

/// The caller's cart, created empty on first access.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = CartRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;
    Ok(Json(cart.into()))
}

/// Add a line, summing with an existing line for the same product.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<Value>,
) -> Result<Json<CartResponse>> {
    let item: LineItem = decode_body(body)?;
    tracing::debug!(product_id = %item.product_id, quantity = %item.quantity, "Adding line");

    let cart = CartRepository::new(state.pool())
        .edit(user.id, IfMissing::Create, |items| {
            cart::add_item(items, item);
            Ok::<_, AppError>(())
        })
        .await?;
    Ok(Json(cart.into()))
}

/// Overwrite a line's quantity. Zero removes the line.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<CartResponse>> {
    let quantity = parse_quantity(&body.quantity)?;
    let product_id = path_product_id(&product_id)?;

    let cart = CartRepository::new(state.pool())
        .edit(user.id, IfMissing::Fail, |items| {
            if cart::set_quantity(items, &product_id, quantity) {
                Ok(())
            } else {
                Err(item_not_found())
            }
        })
        .await
        .map_err(cart_not_found)?;
    Ok(Json(cart.into()))
}

/// Remove a line. Removing an absent product leaves the cart unchanged.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let product_id = ProductId::parse(&product_id).ok();

    let cart = CartRepository::new(state.pool())
        .edit(user.id, IfMissing::Fail, |items| {
            if let Some(product_id) = &product_id {
                cart::remove_item(items, product_id);
            }
            Ok::<_, AppError>(())
        })
        .await
        .map_err(cart_not_found)?;
    Ok(Json(cart.into()))
}

/// Empty the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = CartRepository::new(state.pool())
        .edit(user.id, IfMissing::Create, |items| {
            items.clear();
            Ok::<_, AppError>(())
        })
        .await?;
    Ok(Json(cart.into()))
}

/// Fold a guest cart into the stored cart, summing shared products.
#[instrument(skip_all, fields(user_id = %user.id, merged_lines))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<MergeRequest>,
) -> Result<Json<CartResponse>> {
    let incoming = parse_lines(body.items)?;
    tracing::Span::current().record("merged_lines", incoming.len());

    let cart = CartRepository::new(state.pool())
        .edit(user.id, IfMissing::Create, |items| {
            *items = cart::merge(items.as_slice(), &incoming);
            Ok::<_, AppError>(())
        })
        .await?;

    tracing::info!(lines = cart.items.len(), "Guest cart merged");
    let merged = incoming.len().to_string();
    add_breadcrumb("cart", "Merged guest cart", Some(&[("lines", merged.as_str())]));

    Ok(Json(cart.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!(3)).unwrap(), 3);
        assert_eq!(parse_quantity(&json!(0)).unwrap(), 0);
        assert!(parse_quantity(&json!(-1)).is_err());
        assert!(parse_quantity(&json!(1.5)).is_err());
        assert!(parse_quantity(&json!("2")).is_err());
        assert!(parse_quantity(&Value::Null).is_err());
        assert!(parse_quantity(&json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_parse_lines_requires_array() {
        let err = parse_lines(json!({"productId": "p1"})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid items format"));
    }

    #[test]
    fn test_parse_lines_reports_bad_index() {
        let err = parse_lines(json!([
            {"productId": "p1", "name": "Mug", "price": 12.5, "quantity": 1},
            {"productId": "p2", "name": "Tea", "price": 4, "quantity": 0}
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid item at index 1")));
    }

    #[test]
    fn test_parse_lines_accepts_legacy_shapes() {
        let lines = parse_lines(json!([
            {"_id": "p1", "name": "Mug", "price": "$12.50"},
            {"id": "p2", "name": "Tea", "price": 4, "quantity": 2}
        ]))
        .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity.get(), 1);
        assert_eq!(lines[1].product_id.as_str(), "p2");
    }

    #[test]
    fn test_cart_not_found_only_rewrites_missing_cart() {
        let err = cart_not_found(AppError::Database(RepositoryError::NotFound));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Cart not found"));

        let err = cart_not_found(item_not_found());
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Item not found in cart"));
    }
}

//! Product catalog route handlers.
//!
//! Reads are public and served from the catalog cache. Writes require an
//! admin token.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::instrument;

use boutique_core::ProductId;

use super::decode_body;
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product};
use crate::state::AppState;

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// Path IDs that are blank can never match a product.
fn parse_id(id: &str) -> Result<ProductId> {
    ProductId::parse(id).map_err(|_| product_not_found())
}

fn validated_name(input: &NewProduct) -> Result<&str> {
    input
        .name()
        .ok_or_else(|| AppError::BadRequest("Product name is required".to_string()))
}

/// All products, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list().await?;
    Ok(Json(products.as_ref().clone()))
}

/// A single product.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    state
        .catalog()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

/// Add a product to the catalog.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let input: NewProduct = decode_body(body)?;
    let name = validated_name(&input)?;

    let product = state.catalog().create(name, &input).await?;
    tracing::info!(product_id = %product.id, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    let input: NewProduct = decode_body(body)?;
    let name = validated_name(&input)?;

    let product = state
        .catalog()
        .update(&id, name, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            other => other.into(),
        })?;

    Ok(Json(product))
}

/// Remove a product from the catalog.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&id)?;
    if !state.catalog().delete(&id).await? {
        return Err(product_not_found());
    }

    tracing::info!("Product deleted");
    Ok(Json(json!({ "message": "Product removed" })))
}

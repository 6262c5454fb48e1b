//! Cart repository.
//!
//! Each account has exactly one cart row. Every mutation runs in its own
//! transaction holding a row lock, so concurrent requests for the same account
//! serialise instead of overwriting each other's lines.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use boutique_core::{Cart, CartOwner, LineItem, UserId};

use super::RepositoryError;

/// What [`CartRepository::edit`] does when the account has no cart yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfMissing {
    /// Create an empty cart and edit that.
    Create,
    /// Fail with [`RepositoryError::NotFound`].
    Fail,
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    items: serde_json::Value,
    updated_at: DateTime<Utc>,
}

/// Decode a JSONB line array.
pub(super) fn decode_items(value: serde_json::Value) -> Result<Vec<LineItem>, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid cart items: {e}")))
}

/// Lock the account's cart row for the rest of the transaction and return its lines.
pub(super) async fn lock_items(
    conn: &mut PgConnection,
    user_id: UserId,
    if_missing: IfMissing,
) -> Result<Vec<LineItem>, RepositoryError> {
    if if_missing == IfMissing::Create {
        sqlx::query(
            "INSERT INTO boutique.cart (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id.as_i32())
        .execute(&mut *conn)
        .await?;
    }

    let row = sqlx::query_as::<_, CartRow>(
        "SELECT items, updated_at FROM boutique.cart WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id.as_i32())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    decode_items(row.items)
}

/// Overwrite the account's lines and bump `updated_at`.
pub(super) async fn store_items(
    conn: &mut PgConnection,
    user_id: UserId,
    items: Vec<LineItem>,
) -> Result<Cart, RepositoryError> {
    let updated_at: DateTime<Utc> = sqlx::query_scalar(
        r"
        UPDATE boutique.cart
        SET items = $2, updated_at = NOW()
        WHERE user_id = $1
        RETURNING updated_at
        ",
    )
    .bind(user_id.as_i32())
    .bind(Json(&items))
    .fetch_one(&mut *conn)
    .await?;

    Ok(Cart {
        owner: CartOwner::User(user_id),
        items,
        updated_at,
    })
}

/// Repository for per-account carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The account's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored lines are invalid.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO boutique.cart (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING items, updated_at
            ",
        )
        .bind(user_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        Ok(Cart {
            owner: CartOwner::User(user_id),
            items: decode_items(row.items)?,
            updated_at: row.updated_at,
        })
    }

    /// Read-modify-write the account's lines in one transaction.
    ///
    /// `apply` runs while the cart row is locked. If it fails, nothing is
    /// written and its error is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (converted into `E`) if the cart
    /// doesn't exist and `if_missing` is [`IfMissing::Fail`], or whatever
    /// `apply` returns.
    pub async fn edit<F, E>(
        &self,
        user_id: UserId,
        if_missing: IfMissing,
        apply: F,
    ) -> Result<Cart, E>
    where
        F: FnOnce(&mut Vec<LineItem>) -> Result<(), E> + Send,
        E: From<RepositoryError>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut items = lock_items(&mut *tx, user_id, if_missing).await?;
        apply(&mut items)?;
        let cart = store_items(&mut *tx, user_id, items).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(cart)
    }
}

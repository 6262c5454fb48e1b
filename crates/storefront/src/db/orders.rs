//! Order history repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use boutique_core::{Order, OrderId, UserId};

use super::RepositoryError;
use super::carts::{IfMissing, decode_items, lock_items, store_items};

const ORDER_COLUMNS: &str = "id, user_id, items, total, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    items: serde_json::Value,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: decode_items(row.items)?,
            total: row.total,
            date: row.created_at,
        })
    }
}

/// Repository for checkout snapshots.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Snapshot the account's cart into a new order and empty the cart, in one
    /// transaction.
    ///
    /// # Returns
    ///
    /// Returns `None` without writing anything if the cart is empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the order total overflows, or
    /// `RepositoryError::Database` if any statement fails.
    pub async fn checkout(&self, user_id: UserId) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let items = lock_items(&mut *tx, user_id, IfMissing::Create).await?;
        if items.is_empty() {
            return Ok(None);
        }
        let total = Order::total_of(&items)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO boutique."order" (user_id, items, total)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id.as_i32())
        .bind(Json(&items))
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        store_items(&mut *tx, user_id, Vec::new()).await?;
        tx.commit().await?;

        row.try_into().map(Some)
    }

    /// The account's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM boutique."order"
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Delete the account's order history.
    ///
    /// # Returns
    ///
    /// The number of orders deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM boutique."order" WHERE user_id = $1"#)
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

//! Order snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, UserId};
use super::line_item::{LineItem, ValidationError};

/// An immutable snapshot of a cart taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub date: DateTime<Utc>,
}

impl Order {
    /// Sum of the line totals of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TotalOverflow`] if a line total or the sum
    /// does not fit a [`Decimal`].
    pub fn total_of(items: &[LineItem]) -> Result<Decimal, ValidationError> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| {
                item.line_total()
                    .and_then(|line| total.checked_add(line))
            })
            .ok_or(ValidationError::TotalOverflow)
    }
}

//! Carts and the rules for combining and editing their lines.
//!
//! Both the backend (authoritative per-user carts) and the client (guest carts
//! kept in local storage) apply the functions in this module, so a line is
//! deduplicated and summed the same way wherever it lands.

mod lines;
mod merge;

pub use lines::{add_item, remove_item, set_quantity};
pub use merge::{merge, total_quantity};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LineItem, Order, UserId, ValidationError};

/// Who a cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum CartOwner {
    /// Guest cart, lives only in client storage.
    Anonymous,
    /// Account cart, lives in the persistence layer.
    User(UserId),
}

/// An ordered list of unique-by-product line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub owner: CartOwner,
    pub items: Vec<LineItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart for `owner`.
    #[must_use]
    pub fn new(owner: CartOwner) -> Self {
        Self {
            owner,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Replace the lines wholesale, folding any duplicate products.
    pub fn replace_items(&mut self, items: &[LineItem]) {
        self.items = merge(&[], items);
        self.touch();
    }

    /// Refresh `updated_at`. Call after every mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of all line totals.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TotalOverflow`] if the sum does not fit.
    pub fn subtotal(&self) -> Result<Decimal, ValidationError> {
        Order::total_of(&self.items)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Price;

    fn line(id: &str, qty: u32, cents: i64) -> LineItem {
        LineItem::new(id, id, Price::from_cents(cents).unwrap(), qty, None).unwrap()
    }

    #[test]
    fn test_count_and_subtotal() {
        let mut cart = Cart::new(CartOwner::Anonymous);
        assert!(cart.is_empty());

        cart.replace_items(&[line("a", 2, 300), line("b", 1, 150)]);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal().unwrap(), Decimal::new(750, 2));
    }

    #[test]
    fn test_replace_items_folds_duplicates() {
        let mut cart = Cart::new(CartOwner::User(UserId::new(1)));
        cart.replace_items(&[line("a", 1, 100), line("a", 2, 100)]);
        assert_eq!(cart.items.len(), 1);
        let a = crate::ProductId::parse("a").unwrap();
        assert_eq!(total_quantity(&cart.items, &a), 3);
    }

    #[test]
    fn test_touch_moves_updated_at_forward() {
        let mut cart = Cart::new(CartOwner::Anonymous);
        let before = cart.updated_at;
        cart.touch();
        assert!(cart.updated_at >= before);
    }
}

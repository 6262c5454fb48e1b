//! Direct line edits on a single cart.

use crate::types::{LineItem, ProductId, Quantity};

/// Add `item` to `items`, incrementing the existing line for the same product.
///
/// Same rule as [`merge`](super::merge) with a single incoming line.
pub fn add_item(items: &mut Vec<LineItem>, item: LineItem) {
    match items
        .iter_mut()
        .find(|existing| existing.product_id == item.product_id)
    {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        }
        None => items.push(item),
    }
}

/// Overwrite the quantity of a line. A quantity of 0 removes the line.
///
/// This is a user edit, not a merge: the new quantity replaces the old one.
/// Returns `false` when no line for `product_id` exists.
pub fn set_quantity(items: &mut Vec<LineItem>, product_id: &ProductId, quantity: u32) -> bool {
    let Ok(quantity) = Quantity::new(quantity) else {
        return remove_item(items, product_id);
    };

    match items.iter_mut().find(|item| &item.product_id == product_id) {
        Some(item) => {
            item.quantity = quantity;
            true
        }
        None => false,
    }
}

/// Remove every line for `product_id`. Returns whether anything was removed.
pub fn remove_item(items: &mut Vec<LineItem>, product_id: &ProductId) -> bool {
    let before = items.len();
    items.retain(|item| &item.product_id != product_id);
    items.len() != before
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Price, total_quantity};

    fn line(id: &str, qty: u32) -> LineItem {
        LineItem::new(id, id, Price::from_cents(100).unwrap(), qty, None).unwrap()
    }

    fn pid(id: &str) -> ProductId {
        ProductId::parse(id).unwrap()
    }

    #[test]
    fn test_add_item_increments_existing_line() {
        let mut items = vec![line("p1", 1)];
        add_item(&mut items, line("p1", 2));
        add_item(&mut items, line("p2", 1));

        assert_eq!(items.len(), 2);
        assert_eq!(total_quantity(&items, &pid("p1")), 3);
        assert_eq!(total_quantity(&items, &pid("p2")), 1);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut items = vec![line("p1", 5)];
        assert!(set_quantity(&mut items, &pid("p1"), 2));
        assert_eq!(total_quantity(&items, &pid("p1")), 2);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut items = vec![line("p1", 5), line("p2", 1)];
        assert!(set_quantity(&mut items, &pid("p1"), 0));
        assert_eq!(items, vec![line("p2", 1)]);
    }

    #[test]
    fn test_set_quantity_on_absent_product() {
        let mut items = vec![line("p1", 1)];
        assert!(!set_quantity(&mut items, &pid("nope"), 3));
        assert!(!set_quantity(&mut items, &pid("nope"), 0));
        assert_eq!(items, vec![line("p1", 1)]);
    }

    #[test]
    fn test_remove_item_is_noop_when_absent() {
        let mut items = vec![line("p1", 1)];
        assert!(remove_item(&mut items, &pid("p1")));
        assert!(!remove_item(&mut items, &pid("p1")));
        assert!(items.is_empty());
    }
}

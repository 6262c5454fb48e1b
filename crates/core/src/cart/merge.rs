//! Cart merge engine.

use std::collections::HashMap;

use crate::types::{LineItem, ProductId};

/// Merge `incoming` lines into `base`.
///
/// The result starts from `base` in its original order. Each incoming line
/// whose product is already present adds its quantity to the existing line
/// (sum, never max or overwrite) and the existing line keeps its `name`,
/// `price` and `image`. Incoming lines for new products are appended in
/// their original order.
///
/// Duplicate products inside either input are folded with the same rule, so
/// the output never holds two lines for one product and the quantity of every
/// product equals the sum over both inputs (saturating at
/// [`Quantity::MAX`](crate::Quantity::MAX)).
///
/// # Example
///
/// ```
/// use boutique_core::{LineItem, Price, merge};
///
/// let line = |id: &str, qty| LineItem::new(id, id, Price::ZERO, qty, None).unwrap();
///
/// let merged = merge(&[line("p1", 3), line("p2", 1)], &[line("p1", 1)]);
/// assert_eq!(merged, vec![line("p1", 4), line("p2", 1)]);
/// ```
#[must_use]
pub fn merge(base: &[LineItem], incoming: &[LineItem]) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(base.len() + incoming.len());
    let mut positions: HashMap<ProductId, usize> = HashMap::with_capacity(merged.capacity());

    for item in base.iter().chain(incoming) {
        match positions.get(&item.product_id) {
            Some(&idx) => {
                if let Some(existing) = merged.get_mut(idx) {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
            }
            None => {
                positions.insert(item.product_id.clone(), merged.len());
                merged.push(item.clone());
            }
        }
    }

    merged
}

/// Total units of `product_id` across `items`.
///
/// Sums over every matching line, so it also reports the right figure for
/// lists that have not been through [`merge`].
#[must_use]
pub fn total_quantity(items: &[LineItem], product_id: &ProductId) -> u64 {
    items
        .iter()
        .filter(|item| &item.product_id == product_id)
        .map(|item| u64::from(item.quantity.get()))
        .sum()
}

//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{EmptyProductId, ProductId};
use super::price::{Price, PriceError};
use super::quantity::{Quantity, QuantityError};

/// A malformed line item, rejected before it reaches any cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Missing or blank product ID.
    #[error(transparent)]
    ProductId(#[from] EmptyProductId),

    /// Missing or blank display name.
    #[error("line item name cannot be empty")]
    EmptyName,

    /// Price could not be parsed, is negative, or is above the maximum.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Quantity is zero or negative.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// The lines add up to more than a total can hold.
    #[error("order total is too large")]
    TotalOverflow,
}

/// One product-quantity pairing within a cart.
///
/// `name`, `price` and `image` are copied from the catalog when the product is
/// added and are not re-validated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLineItem")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    /// Build a validated line item.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the product ID or name is blank, or the
    /// quantity is zero.
    pub fn new(
        product_id: &str,
        name: &str,
        price: Price,
        quantity: u32,
        image: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        Ok(Self {
            product_id: ProductId::parse(product_id)?,
            name: name.to_owned(),
            price,
            quantity: Quantity::new(quantity)?,
            image: image.filter(|url| !url.trim().is_empty()),
        })
    }

    /// `price * quantity`, or `None` if it does not fit a [`Decimal`].
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_times(self.quantity.get())
    }
}

/// Wire shape accepted on input.
///
/// Guest carts saved by earlier clients keyed lines by `id` or `_id` and left
/// `quantity` out for single units.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLineItem {
    #[serde(alias = "id", alias = "_id")]
    product_id: ProductId,
    name: String,
    price: Price,
    #[serde(default)]
    quantity: Quantity,
    #[serde(default)]
    image: Option<String>,
}

impl TryFrom<RawLineItem> for LineItem {
    type Error = ValidationError;

    fn try_from(raw: RawLineItem) -> Result<Self, Self::Error> {
        Self::new(
            raw.product_id.as_str(),
            &raw.name,
            raw.price,
            raw.quantity.get(),
            raw.image,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_fields() {
        let price = Price::from_cents(500).unwrap();
        assert!(LineItem::new("p1", "Mug", price, 1, None).is_ok());
        assert_eq!(
            LineItem::new(" ", "Mug", price, 1, None),
            Err(ValidationError::ProductId(EmptyProductId))
        );
        assert_eq!(
            LineItem::new("p1", "  ", price, 1, None),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            LineItem::new("p1", "Mug", price, 0, None),
            Err(ValidationError::Quantity(QuantityError::Zero))
        );
    }

    #[test]
    fn test_blank_image_is_dropped() {
        let item = LineItem::new("p1", "Mug", Price::ZERO, 1, Some(String::new())).unwrap();
        assert_eq!(item.image, None);
    }

    #[test]
    fn test_deserialize_camel_case_wire_format() {
        let item: LineItem = serde_json::from_str(
            r#"{"productId":"p1","name":"Mug","price":12.5,"quantity":2,"image":"/mug.png"}"#,
        )
        .unwrap();
        assert_eq!(item.product_id.as_str(), "p1");
        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.line_total(), Some(Decimal::new(25, 0)));
        assert_eq!(item.image.as_deref(), Some("/mug.png"));
    }

    #[test]
    fn test_deserialize_legacy_guest_cart_shape() {
        let item: LineItem =
            serde_json::from_str(r#"{"_id":"abc","name":"Tea","price":"$4.00"}"#).unwrap();
        assert_eq!(item.product_id.as_str(), "abc");
        assert_eq!(item.quantity, Quantity::ONE);
        assert_eq!(item.price, Price::from_cents(400).unwrap());

        let item: LineItem =
            serde_json::from_str(r#"{"id":"xyz","name":"Tea","price":1,"quantity":3}"#).unwrap();
        assert_eq!(item.product_id.as_str(), "xyz");
    }

    #[test]
    fn test_deserialize_rejects_invalid_lines() {
        assert!(serde_json::from_str::<LineItem>(r#"{"productId":"p1","price":1}"#).is_err());
        assert!(
            serde_json::from_str::<LineItem>(r#"{"productId":"p1","name":"","price":1}"#)
                .is_err()
        );
        assert!(
            serde_json::from_str::<LineItem>(
                r#"{"productId":"p1","name":"Mug","price":1,"quantity":0}"#
            )
            .is_err()
        );
    }

    #[test]
    fn test_deserialize_rejects_oversized_price() {
        let err = serde_json::from_str::<LineItem>(
            r#"{"productId":"p1","name":"Mug","price":"100000000000000000000","quantity":1000000000}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("price cannot exceed"));
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let item = LineItem::new("p1", "Mug", Price::from_cents(250).unwrap(), 2, None).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId": "p1", "name": "Mug", "price": "2.50", "quantity": 2})
        );
    }
}

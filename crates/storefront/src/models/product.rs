//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or replacing a product.
///
/// `id` is optional on create; the server assigns one when it is absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewProduct {
    /// Trimmed name, or `None` if blank.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        Some(self.name.trim()).filter(|name| !name.is_empty())
    }

    /// Image URL with blanks treated as absent.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_accepts_formatted_price() {
        let input: NewProduct =
            serde_json::from_str(r#"{"name": " Mug ", "price": "$1,250.00", "image": ""}"#)
                .unwrap();
        assert_eq!(input.name(), Some("Mug"));
        assert_eq!(input.price, Price::from_cents(125_000).unwrap());
        assert_eq!(input.image(), None);
        assert!(input.id.is_none());
    }

    #[test]
    fn test_new_product_rejects_negative_price() {
        let result: Result<NewProduct, _> =
            serde_json::from_str(r#"{"name": "Mug", "price": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_name_is_none() {
        let input: NewProduct = serde_json::from_str(r#"{"name": "  ", "price": 1}"#).unwrap();
        assert_eq!(input.name(), None);
    }
}

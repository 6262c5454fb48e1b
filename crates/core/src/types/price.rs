//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are denormalized snapshots copied onto line items when a product is
//! added to a cart. Guest carts written by older clients stored prices as
//! display strings such as `"$19.99"`, so deserialization accepts both JSON
//! numbers and formatted strings and normalizes them to a [`Decimal`].

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Currency symbols stripped from formatted price strings.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input could not be read as a decimal amount.
    #[error("invalid price: {0:?}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit the catalog's `NUMERIC(12, 2)` column.
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A non-negative currency amount in the store currency's standard unit
/// (dollars, not cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest storable price, 9,999,999,999.99.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero, or
    /// [`PriceError::TooLarge`] if it is above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_zero() {
            return Ok(Self::ZERO);
        }
        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Wrap an amount without checking bounds, to exercise overflow handling.
    #[cfg(test)]
    pub(crate) const fn from_unchecked(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `cents` is below zero.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// Parse a price from a plain or formatted string.
    ///
    /// Accepts `"19.99"`, `"$19.99"`, `" $1,299.00 "` and similar.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the string is not a decimal amount,
    /// or [`PriceError::Negative`] if it is below zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        let unsigned = trimmed.trim_start_matches(CURRENCY_SYMBOLS).trim_start();
        let cleaned: String = unsigned.chars().filter(|c| *c != ',').collect();

        let amount =
            Decimal::from_str(&cleaned).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display with two decimal places (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }

    /// Multiply by a line quantity, or `None` if the product overflows.
    #[must_use]
    pub fn checked_times(&self, quantity: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self::parse(&s),
            // Number's Display is the shortest round-trip form, so 19.99 stays 19.99.
            Raw::Number(n) => Self::parse(&n.to_string()),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formatted_strings() {
        let expected = Price::from_cents(1999).unwrap();
        assert_eq!(Price::parse("19.99").unwrap(), expected);
        assert_eq!(Price::parse("$19.99").unwrap(), expected);
        assert_eq!(Price::parse("  $ 19.99 ").unwrap(), expected);
        assert_eq!(
            Price::parse("$1,299.00").unwrap(),
            Price::from_cents(129_900).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage_and_negative() {
        assert!(matches!(Price::parse("free"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid(_))));
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert_eq!(Price::from_cents(-5), Err(PriceError::Negative));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert_eq!(Price::parse("0").unwrap(), Price::ZERO);
        assert_eq!(Price::parse("-0.00").unwrap().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_number_and_string_deserialize_equal() {
        let from_number: Price = serde_json::from_str("19.99").unwrap();
        let from_string: Price = serde_json::from_str("\"$19.99\"").unwrap();
        assert_eq!(from_number, from_string);

        let integer: Price = serde_json::from_str("25").unwrap();
        assert_eq!(integer, Price::from_cents(2500).unwrap());
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Price>("-3.5").is_err());
    }

    #[test]
    fn test_serializes_as_plain_decimal_string() {
        let price = Price::from_cents(1999).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"19.99\"");
    }

    #[test]
    fn test_display_and_times() {
        let price = Price::parse("4.5").unwrap();
        assert_eq!(price.display(), "$4.50");
        assert_eq!(price.checked_times(3), Some(Decimal::new(135, 1)));
    }

    #[test]
    fn test_bounded_by_catalog_column() {
        assert_eq!(Price::MAX.amount(), Decimal::new(999_999_999_999, 2));
        assert_eq!(Price::parse("9,999,999,999.99").unwrap(), Price::MAX);
        assert_eq!(Price::parse("10000000000"), Err(PriceError::TooLarge));
        assert!(
            serde_json::from_str::<Price>("\"100000000000000000000\"").is_err(),
            "oversized prices must not reach a cart"
        );
    }

    #[test]
    fn test_max_price_times_max_quantity_fits() {
        assert!(Price::MAX.checked_times(u32::MAX).is_some());
    }
}

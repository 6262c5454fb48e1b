//! Domain models for storefront.
//!
//! Validated domain types, separate from the database row types in [`crate::db`].
//! Carts and orders use [`boutique_core::Cart`] and [`boutique_core::Order`] directly.

pub mod product;
pub mod user;

pub use product::{NewProduct, Product};
pub use user::{User, UserProfile};

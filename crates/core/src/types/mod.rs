//! Core types for Boutique.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod line_item;
pub mod order;
pub mod price;
pub mod quantity;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use line_item::{LineItem, ValidationError};
pub use order::Order;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use role::{AuthProvider, UserRole};

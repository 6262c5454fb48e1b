//! Boutique Core - Shared domain types and cart rules.
//!
//! This crate provides the types and pure logic shared by every Boutique component:
//! - `storefront` - REST backend (accounts, catalog, carts, orders)
//! - `client` - Cart session controller with local and remote cart stores
//! - `cli` - Command-line tools for migrations, seeding and driving a cart session
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The cart merge engine lives here so that the backend
//! and the client apply exactly the same dedup-and-sum rule.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails and line items
//! - [`cart`] - Cart merge engine and line mutation rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartOwner, merge, total_quantity};
pub use types::*;

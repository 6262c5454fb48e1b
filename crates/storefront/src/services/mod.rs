//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password accounts, bearer tokens and signed OAuth state
//! - `catalog` - Cached product catalog
//! - `google` - Google OAuth 2.0 code exchange and profile lookup

pub mod auth;
pub mod catalog;
pub mod google;

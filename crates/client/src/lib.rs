//! Boutique client library.
//!
//! Keeps a shopper's cart consistent across anonymous and signed-in sessions.
//!
//! # Architecture
//!
//! - [`local`] - Local Cart Store: bearer token, guest cart and the staged
//!   merge buffer, persisted as one JSON document
//! - [`remote`] - Remote Cart Store: the authoritative per-account cart behind
//!   the storefront's `/cart` endpoints
//! - [`session`] - Cart Session Controller: the anonymous/authenticating/
//!   authenticated state machine that stages, merges and clears carts
//! - [`auth`] - Credential exchange (password, registration, Google) that
//!   yields the bearer token a session is started with
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use boutique_client::{AuthClient, CartSession, ClientConfig, FileStore, HttpCartClient};
//!
//! let config = ClientConfig::from_env()?;
//! let remote = Arc::new(HttpCartClient::new(&config)?);
//! let store = Arc::new(FileStore::new(&config.state_file));
//! let session = CartSession::restore(remote, store).await?;
//!
//! let auth = AuthClient::new(&config)?;
//! let login = auth.login("shopper@example.com", "hunter2hunter2").await?;
//! let outcome = session.complete_login(login.token).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod local;
pub mod remote;
pub mod session;

#[cfg(test)]
mod testing;

pub use auth::{AuthClient, AuthResponse, RegisterRequest, UserProfile};
pub use config::{ClientConfig, ConfigError};
pub use local::{CartStorage, FileStore, LocalStore, MemoryStore, StoreError, StoredState};
pub use remote::{HttpCartClient, RemoteCartStore, RemoteError};
pub use session::{CartSession, LoginOutcome, LogoutOutcome, SessionError, SessionMode, SyncWarning};

//! Remote Cart Store.
//!
//! The authoritative cart of a signed-in account, reached through the
//! storefront's authenticated `/cart` endpoints. Every mutating call answers
//! with the account's full cart after the change, so callers never patch
//! their copy by hand.

pub(crate) mod http;

pub use http::HttpCartClient;

use async_trait::async_trait;
use boutique_core::{LineItem, Order, ProductId};
use reqwest::StatusCode;
use secrecy::SecretString;
use thiserror::Error;

/// Errors from a remote call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The bearer token was rejected. The session is over.
    #[error("authentication required")]
    Unauthorized,

    /// The server rejected the request body.
    #[error("rejected by server: {0}")]
    Validation(String),

    /// The cart or cart line does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request never completed (DNS, connect, TLS, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Unauthorized | Self::Validation(_) | Self::NotFound(_) | Self::Decode(_) => {
                false
            }
        }
    }
}

/// Operations on the signed-in account's cart.
///
/// Implementations must be safe to share across tasks. Every method sends the
/// caller's bearer token and fails with [`RemoteError::Unauthorized`] when the
/// server rejects it.
#[async_trait]
pub trait RemoteCartStore: Send + Sync {
    /// The account's cart, empty if it has never been written.
    async fn fetch(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError>;

    /// Add a line, incrementing an existing line for the same product.
    async fn add_item(
        &self,
        token: &SecretString,
        item: &LineItem,
    ) -> Result<Vec<LineItem>, RemoteError>;

    /// Overwrite a line's quantity. Zero removes the line.
    async fn set_quantity(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<LineItem>, RemoteError>;

    /// Remove a line. Removing an absent line is not an error.
    async fn remove_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<Vec<LineItem>, RemoteError>;

    /// Empty the cart.
    async fn clear(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError>;

    /// Merge `items` into the account cart, summing quantities per product.
    async fn merge(
        &self,
        token: &SecretString,
        items: &[LineItem],
    ) -> Result<Vec<LineItem>, RemoteError>;

    /// Turn the cart into an order and empty it.
    async fn checkout(&self, token: &SecretString) -> Result<Order, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Timeout.is_transient());
        assert!(RemoteError::Transport("reset".into()).is_transient());
        assert!(
            RemoteError::Status {
                status: StatusCode::BAD_GATEWAY,
                message: String::new(),
            }
            .is_transient()
        );
        assert!(!RemoteError::Unauthorized.is_transient());
        assert!(!RemoteError::Validation("bad".into()).is_transient());
        assert!(
            !RemoteError::Status {
                status: StatusCode::CONFLICT,
                message: String::new(),
            }
            .is_transient()
        );
    }
}

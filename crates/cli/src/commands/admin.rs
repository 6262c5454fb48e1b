//! Account role management commands.
//!
//! # Usage
//!
//! ```bash
//! # Allow an existing account to manage the catalog
//! boutique admin grant -e owner@example.com
//!
//! # Make it a regular shopper again
//! boutique admin revoke -e owner@example.com
//! ```
//!
//! The account must already exist (register it through the API first).
//! Tokens issued before the change keep their old role until they expire.

use boutique_core::{Email, UserRole};
use boutique_storefront::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::{DatabaseError, connect};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with this email.
    #[error("No account with email: {0}")]
    UserNotFound(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Give an account the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn grant(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

/// Return an account to the regular shopper role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::User).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&parsed, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}

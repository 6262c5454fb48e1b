//! Terminal shopper built on the client cart session.
//!
//! Each invocation restores the session from the state file, runs one
//! command, and leaves the file in place for the next one. A sign-in that was
//! interrupted mid-merge is finished before the command runs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use boutique_client::{
    AuthClient, CartSession, ClientConfig, ConfigError, FileStore, HttpCartClient, LocalStore,
    RemoteCartStore,
    RegisterRequest, RemoteError, SessionError, StoreError,
};
use boutique_core::Price;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

use crate::output;

/// Errors from shopper commands.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("local state error: {0}")]
    Store(#[from] StoreError),
}

/// A restored cart session plus the clients that back it.
pub struct Shop {
    session: CartSession,
    auth: AuthClient,
    cart: Arc<HttpCartClient>,
}

impl Shop {
    /// Restore the session stored in `state_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the state file
    /// cannot be read or written. A stored token the server rejects leaves a
    /// guest session.
    pub async fn open(
        api_url: &str,
        state_file: &Path,
        timeout_secs: u64,
    ) -> Result<Self, ShopError> {
        let mut config = ClientConfig::for_api(api_url)?;
        config.state_file = state_file.to_path_buf();
        config.timeout = Duration::from_secs(timeout_secs);

        let auth = AuthClient::new(&config)?;
        let cart = Arc::new(HttpCartClient::new(&config)?);
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::new(&config.state_file));

        let remote: Arc<dyn RemoteCartStore> = Arc::clone(&cart) as Arc<dyn RemoteCartStore>;
        let session = CartSession::restore(remote, store).await?;
        match session.resume_pending().await {
            Ok(Some(outcome)) => output::print(&output::login(&outcome)),
            Ok(None) => {}
            Err(SessionError::Expired) => {
                warn!("Stored sign-in was rejected, continuing as a guest");
            }
            Err(SessionError::Remote(error)) => {
                warn!(%error, "Pending cart merge was refused, lines kept locally");
            }
            Err(error) => return Err(error.into()),
        }

        Ok(Self {
            session,
            auth,
            cart,
        })
    }

    pub async fn register(
        &self,
        email: String,
        password: String,
        first_name: String,
        last_name: String,
    ) -> Result<(), ShopError> {
        let request = RegisterRequest {
            email,
            password,
            first_name,
            last_name,
        };
        let response = self.auth.register(&request).await?;
        info!(email = %response.user.email, "Account created");
        self.sign_in(response.token).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ShopError> {
        let response = self.auth.login(email, password).await?;
        self.sign_in(response.token).await
    }

    async fn sign_in(&self, token: SecretString) -> Result<(), ShopError> {
        let outcome = self.session.complete_login(token).await?;
        output::print(&output::login(&outcome));
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ShopError> {
        let outcome = self.session.logout().await?;
        if outcome.saved {
            output::print("Signed out");
        } else {
            warn!(lines = outcome.unsynced_lines, "Unsynced lines were discarded");
            output::print(&format!(
                "Signed out; {} unsynced line(s) could not be saved to your account",
                outcome.unsynced_lines
            ));
        }
        Ok(())
    }

    pub async fn whoami(&self) -> Result<(), ShopError> {
        let Some(token) = self.session.token().await else {
            output::print("Not signed in");
            return Ok(());
        };
        let user = self.auth.profile(&token).await?;
        output::print(&output::profile(&user));
        Ok(())
    }

    /// Stage the guest cart and print where to sign in.
    pub async fn google_start(&self, redirect: &str) -> Result<(), ShopError> {
        let url = self.auth.google_login_url(redirect)?;
        let staged = self.session.begin_oauth().await?;
        output::print(&format!(
            "Open this URL to sign in with Google:\n  {url}\n\
             Then run `boutique google complete --token <token>` with the token \
             from the page you land on.\n{} cart line(s) are held until then.",
            staged.len()
        ));
        Ok(())
    }

    pub async fn google_complete(&self, token: String) -> Result<(), ShopError> {
        self.sign_in(SecretString::from(token)).await
    }

    pub async fn google_cancel(&self) -> Result<(), ShopError> {
        let items = self.session.cancel_oauth().await?;
        output::print(&format!(
            "Google sign-in cancelled; {} line(s) back in the guest cart",
            items.len()
        ));
        Ok(())
    }

    pub async fn show(&self) -> Result<(), ShopError> {
        let items = self.session.refresh().await?;
        self.print_cart(&items).await;
        Ok(())
    }

    pub async fn add(
        &self,
        product_id: &str,
        name: &str,
        price: Price,
        quantity: u32,
        image: Option<String>,
    ) -> Result<(), ShopError> {
        let items = self
            .session
            .add_item(product_id, name, price, quantity, image)
            .await?;
        self.print_cart(&items).await;
        Ok(())
    }

    pub async fn set_quantity(&self, product_id: &str, quantity: u32) -> Result<(), ShopError> {
        let items = self.session.set_quantity(product_id, quantity).await?;
        self.print_cart(&items).await;
        Ok(())
    }

    pub async fn remove(&self, product_id: &str) -> Result<(), ShopError> {
        let items = self.session.remove_item(product_id).await?;
        self.print_cart(&items).await;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ShopError> {
        let items = self.session.clear().await?;
        self.print_cart(&items).await;
        Ok(())
    }

    pub async fn sync(&self) -> Result<(), ShopError> {
        let outcome = self.session.sync().await?;
        output::print(&output::login(&outcome));
        self.print_cart(&self.session.items().await).await;
        Ok(())
    }

    pub async fn checkout(&self) -> Result<(), ShopError> {
        let order = self.session.checkout().await?;
        output::print(&output::order(&order));
        Ok(())
    }

    pub async fn orders(&self) -> Result<(), ShopError> {
        let token = self
            .session
            .token()
            .await
            .ok_or(SessionError::NotAuthenticated)?;
        let orders = self.cart.orders(&token).await?;
        output::print(&output::orders(&orders));
        Ok(())
    }

    async fn print_cart(&self, items: &[boutique_core::LineItem]) {
        output::print(&output::cart(items, self.session.mode().await));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boutique_client::SessionMode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// An API that rejects every bearer token.
    async fn rejecting_api() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = vec![0_u8; 8192];
                let _ = socket.read(&mut request).await;
                let body = r#"{"message":"Token is not valid"}"#;
                let response = format!(
                    "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn test_open_survives_expired_pending_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("state.json");
        std::fs::write(
            &state_file,
            r#"{
                "authToken": "stale",
                "localCartItems": [],
                "pendingMergeCartItems": [
                    {"productId": "p1", "name": "Mug", "price": "12.50", "quantity": 2}
                ]
            }"#,
        )
        .unwrap();

        let shop = Shop::open(&rejecting_api().await, &state_file, 5)
            .await
            .unwrap();

        assert_eq!(shop.session.mode().await, SessionMode::Anonymous);
        let items = shop.session.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity.get(), 2);
    }
}

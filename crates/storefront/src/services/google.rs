//! Google OAuth 2.0 client.
//!
//! # OAuth Flow
//!
//! 1. Build the consent URL with [`GoogleClient::authorization_url`]
//! 2. Redirect the user to Google
//! 3. Google redirects back with an authorization code
//! 4. Exchange the code for an access token with [`GoogleClient::exchange_code`]
//! 5. Fetch the user's identity with [`GoogleClient::user_info`]

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Errors from the Google OAuth endpoints.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google rejected the exchange.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Endpoint URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Google did not vouch for the account's email address.
    #[error("Google account email is not verified")]
    UnverifiedEmail,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// The identity fields we use from Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account ID.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Google OAuth client.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct GoogleClient {
    inner: Arc<GoogleClientInner>,
}

struct GoogleClientInner {
    client: reqwest::Client,
    authorize_url: Url,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
}

impl GoogleClient {
    /// Create a client for the configured OAuth app.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Http` if the HTTP client cannot be built.
    /// Returns `GoogleError::Url` if the consent endpoint URL cannot be parsed.
    pub fn new(config: &GoogleConfig, redirect_uri: String) -> Result<Self, GoogleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(GoogleClientInner {
                client,
                authorize_url: Url::parse(AUTHORIZE_URL)?,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                redirect_uri,
            }),
        })
    }

    /// The consent screen URL carrying `state` through the round trip.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.inner.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.inner.client_id)
            .append_pair("redirect_uri", &self.inner.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("prompt", "select_account")
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::OAuth` if Google rejects the code.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<String, GoogleError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.inner.redirect_uri.as_str()),
        ];

        let response = self
            .inner
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleError::OAuth(format!("Token exchange failed: {text}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in Google account's identity.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::UnverifiedEmail` if Google has not verified the
    /// account's email, since accounts are matched by email.
    #[tracing::instrument(skip_all)]
    pub async fn user_info(&self, access_token: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .inner
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GoogleError::OAuth(format!(
                "Userinfo request failed: {}",
                response.status()
            )));
        }

        let profile: GoogleProfile = response.json().await?;
        if !profile.email_verified {
            return Err(GoogleError::UnverifiedEmail);
        }
        Ok(profile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> GoogleClient {
        GoogleClient::new(
            &GoogleConfig {
                client_id: "client-123.apps.googleusercontent.com".to_string(),
                client_secret: SecretString::from("gsecret"),
            },
            "http://localhost:3001/api/auth/google/callback".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_carries_state_and_redirect() {
        let url = client().authorization_url("signed.state.value");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["state"], "signed.state.value");
        assert_eq!(
            pairs["redirect_uri"],
            "http://localhost:3001/api/auth/google/callback"
        );
        assert_eq!(pairs["response_type"], "code");
        assert!(!url.as_str().contains("gsecret"));
    }

    #[test]
    fn test_profile_defaults_missing_names() {
        let profile: GoogleProfile =
            serde_json::from_str(r#"{"sub": "1180", "email": "a@b.io", "email_verified": true}"#)
                .unwrap();
        assert!(profile.email_verified);
        assert_eq!(profile.given_name, None);
    }
}

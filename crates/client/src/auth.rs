//! Credential exchange against the storefront's `/auth` endpoints.
//!
//! Each successful exchange yields a bearer token, which is then handed to
//! [`CartSession::complete_login`](crate::CartSession::complete_login).

use boutique_core::{AuthProvider, Email, UserId, UserRole};
use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::remote::RemoteError;
use crate::remote::http::ApiClient;

/// The signed-in account as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub auth_provider: AuthProvider,
}

/// A bearer token and the account it belongs to.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,
    pub user: UserProfile,
}

fn deserialize_secret<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the storefront's authentication endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    /// Exchange email and password for a token.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unauthorized`] for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, RemoteError> {
        let url = self.api.endpoint("auth/login")?;
        self.api
            .send(
                self.api
                    .request(Method::POST, url, None)
                    .json(&LoginRequest { email, password }),
            )
            .await
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Validation`] for a weak password or malformed
    /// email, and [`RemoteError::Status`] with 409 when the email is taken.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, RemoteError> {
        let url = self.api.endpoint("auth/register")?;
        self.api
            .send(self.api.request(Method::POST, url, None).json(request))
            .await
    }

    /// The account behind `token`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unauthorized`] if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &SecretString) -> Result<UserProfile, RemoteError> {
        let url = self.api.endpoint("auth/profile")?;
        self.api
            .send(self.api.request(Method::GET, url, Some(token)))
            .await
    }

    /// Where to send the shopper to start Google sign-in. After the consent
    /// screen the server redirects to `redirect?token=...`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the URL cannot be built.
    pub fn google_login_url(&self, redirect: &str) -> Result<Url, RemoteError> {
        let mut url = self.api.endpoint("auth/google/login")?;
        url.query_pairs_mut().append_pair("redirect", redirect);
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_google_login_url_encodes_redirect() {
        let client =
            AuthClient::new(&ClientConfig::for_api("http://localhost:3001/api").unwrap()).unwrap();
        let url = client.google_login_url("/cart?step=2").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/api/auth/google/login?redirect=%2Fcart%3Fstep%3D2"
        );
    }

    #[test]
    fn test_auth_response_deserialize() {
        let json = r#"{
            "token": "eyJhbGciOiJIUzI1NiJ9.e30.sig",
            "user": {
                "id": 7,
                "email": "Shopper@Example.com",
                "firstName": "Sam",
                "lastName": "Shopper",
                "role": "user",
                "authProvider": "google"
            }
        }"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.token.expose_secret(), "eyJhbGciOiJIUzI1NiJ9.e30.sig");
        assert_eq!(response.user.id, UserId::new(7));
        assert_eq!(response.user.email.as_str(), "shopper@example.com");
        assert_eq!(response.user.auth_provider, AuthProvider::Google);
    }

    #[test]
    fn test_register_request_uses_camel_case() {
        let request = RegisterRequest {
            email: "a@b.io".to_string(),
            password: "correct horse".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["firstName"], "A");
        assert_eq!(json["lastName"], "B");
    }
}

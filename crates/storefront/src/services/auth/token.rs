//! Signed bearer tokens and OAuth `state` values.
//!
//! Both are HS256 JWTs under the same secret. OAuth state tokens carry a
//! fixed audience and a `redirect` claim, so neither kind verifies as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use boutique_core::{UserId, UserRole};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::User;

const OAUTH_STATE_AUDIENCE: &str = "boutique-oauth-state";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID as a decimal string.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` is not a user ID.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Claims carried through Google's consent screen in the `state` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OAuthStateClaims {
    aud: String,
    redirect: String,
    nonce: String,
    iat: i64,
    exp: i64,
}

/// Signing and verification keys for bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Derive keys from the configured secret.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expiry: Duration::hours(config.expiry_hours),
        }
    }

    /// Issue a bearer token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify a bearer token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, forged, or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Bearer token rejected");
                AuthError::InvalidToken
            })
    }

    /// Sign an OAuth `state` value remembering where to send the user afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_oauth_state(&self, redirect: &str, nonce: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = OAuthStateClaims {
            aud: OAUTH_STATE_AUDIENCE.to_string(),
            redirect: redirect.to_string(),
            nonce: nonce.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(OAUTH_STATE_TTL_MINUTES)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify an OAuth `state` value and return its redirect path.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the state is forged or expired.
    pub fn verify_oauth_state(&self, state: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[OAUTH_STATE_AUDIENCE]);
        decode::<OAuthStateClaims>(state, &self.decoding, &validation)
            .map(|data| data.claims.redirect)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boutique_core::{AuthProvider, Email};
    use secrecy::SecretString;

    fn keys(hours: i64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
            expiry_hours: hours,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(42),
            email: Email::parse("sam@example.com").unwrap(),
            first_name: "Sam".to_string(),
            last_name: "Shopper".to_string(),
            role: UserRole::Admin,
            auth_provider: AuthProvider::Local,
            google_id: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys(24);
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(42));
        assert_eq!(claims.email, "sam@example.com");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys(-1);
        let token = keys.issue(&user()).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = keys(24).issue(&user()).unwrap();
        let other = JwtKeys::new(&JwtConfig {
            secret: SecretString::from("zZ9@qQ8#wW7$eE6%rR5^tT4&yY3*uU2("),
            expiry_hours: 24,
        });
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            keys(24).verify("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_oauth_state_round_trip() {
        let keys = keys(24);
        let state = keys.issue_oauth_state("/cart?step=2", "n0nce").unwrap();
        assert_eq!(keys.verify_oauth_state(&state).unwrap(), "/cart?step=2");
    }

    #[test]
    fn test_tokens_do_not_cross_verify() {
        let keys = keys(24);
        let bearer = keys.issue(&user()).unwrap();
        let state = keys.issue_oauth_state("/", "n0nce").unwrap();
        assert!(keys.verify_oauth_state(&bearer).is_err());
        assert!(keys.verify(&state).is_err());
    }
}

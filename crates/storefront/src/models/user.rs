//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use boutique_core::{AuthProvider, Email, UserId, UserRole};

/// A storefront account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address, stored lowercased.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    /// How the account signs in.
    pub auth_provider: AuthProvider,
    /// Google subject ID, set once the account has signed in with Google.
    pub google_id: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// Last successful password sign-in.
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the account may manage the catalog.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// The public view of a [`User`], as returned by the `/auth` endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            auth_provider: user.auth_provider,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_serializes_camel_case_without_secrets() {
        let user = User {
            id: UserId::new(3),
            email: Email::parse("sam@example.com").unwrap(),
            first_name: "Sam".to_string(),
            last_name: "Shopper".to_string(),
            role: UserRole::User,
            auth_provider: AuthProvider::Google,
            google_id: Some("1180".to_string()),
            created_at: Utc::now(),
            last_login: None,
        };

        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert_eq!(json["firstName"], "Sam");
        assert_eq!(json["authProvider"], "google");
        assert_eq!(json["role"], "user");
        assert!(json.get("googleId").is_none());
        assert!(json.get("lastLogin").is_none());
    }
}

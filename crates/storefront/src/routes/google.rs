//! Google sign-in route handlers.
//!
//! # Flow
//!
//! 1. `GET /auth/google/login?redirect=/cart` signs the redirect path into an
//!    OAuth `state` value and sends the browser to Google.
//! 2. Google calls back with `code` and the same `state`.
//! 3. The callback verifies `state`, exchanges the code, links or creates the
//!    account by email and redirects to `/cart?token=<jwt>`.
//!
//! Any failure in step 3 redirects to `/login?error=google_auth_failed`.

use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use boutique_core::Email;
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{User, UserProfile};
use crate::routes::auth::UserEnvelope;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

const FAILURE_REDIRECT: &str = "/login?error=google_auth_failed";

/// Query parameters for starting Google sign-in.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    /// Path to return to after sign-in.
    pub redirect: Option<String>,
    /// Extra query string to append to `redirect`.
    pub search_params: Option<String>,
}

/// Query parameters Google sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Only same-site paths are accepted as post-login destinations.
fn sanitize_redirect(redirect: Option<&str>) -> &str {
    match redirect.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

/// Join the redirect path and any extra query string.
fn redirect_target(query: &LoginQuery) -> String {
    let path = sanitize_redirect(query.redirect.as_deref());
    match query
        .search_params
        .as_deref()
        .map(|s| s.trim_start_matches('?'))
        .filter(|s| !s.is_empty())
    {
        Some(search) => format!("{path}{}{search}", separator(path)),
        None => path.to_string(),
    }
}

fn separator(url: &str) -> char {
    if url.contains('?') { '&' } else { '?' }
}

/// Append the bearer token to the post-login destination.
fn with_token(redirect: &str, token: &str) -> String {
    let mut encoded = url::form_urlencoded::Serializer::new(String::new());
    encoded.append_pair("token", token);
    format!("{redirect}{}{}", separator(redirect), encoded.finish())
}

/// Redirect to Google's consent screen.
#[instrument(skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect> {
    let google = state
        .google()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".to_string()))?;

    let nonce = Alphanumeric.sample_string(&mut rand::rng(), 24);
    let oauth_state = state
        .jwt()
        .issue_oauth_state(&redirect_target(&query), &nonce)?;

    Ok(Redirect::to(google.authorization_url(&oauth_state).as_str()))
}

/// Handle Google's redirect back to us.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    match complete_sign_in(&state, query).await {
        Ok((user, redirect, token)) => {
            tracing::info!(user_id = %user.id, "Signed in with Google");
            add_breadcrumb("auth", "Signed in with Google", None);
            Redirect::to(&with_token(&redirect, &token))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            Redirect::to(FAILURE_REDIRECT)
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    query: CallbackQuery,
) -> Result<(User, String, String)> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!(
            "Google returned {error}: {}",
            query.error_description.unwrap_or_default()
        )));
    }

    let google = state
        .google()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".to_string()))?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing code".to_string()))?;
    let redirect = state
        .jwt()
        .verify_oauth_state(query.state.as_deref().unwrap_or_default())?;

    let access_token = google.exchange_code(&code).await?;
    let profile = google.user_info(&access_token).await?;

    let email = Email::parse(&profile.email).map_err(AuthError::from)?;
    let user = UserRepository::new(state.pool())
        .upsert_google(
            &email,
            &profile.sub,
            profile.given_name.as_deref().unwrap_or_default(),
            profile.family_name.as_deref().unwrap_or_default(),
        )
        .await?;

    let token = state.jwt().issue(&user)?;
    Ok((user, redirect, token))
}

/// The signed-in account, wrapped as `{ "user": ... }`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserEnvelope>> {
    let user = AuthService::new(state.pool(), state.jwt())
        .get_user(user.id)
        .await?;
    Ok(Json(UserEnvelope {
        user: UserProfile::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_redirect() {
        assert_eq!(sanitize_redirect(Some("/cart")), "/cart");
        assert_eq!(sanitize_redirect(Some("https://evil.example")), "/");
        assert_eq!(sanitize_redirect(Some("//evil.example")), "/");
        assert_eq!(sanitize_redirect(None), "/");
    }

    #[test]
    fn test_redirect_target_appends_search_params() {
        let query = LoginQuery {
            redirect: Some("/products".to_string()),
            search_params: Some("?page=2".to_string()),
        };
        assert_eq!(redirect_target(&query), "/products?page=2");

        let query = LoginQuery {
            redirect: Some("/products?sort=new".to_string()),
            search_params: Some("page=2".to_string()),
        };
        assert_eq!(redirect_target(&query), "/products?sort=new&page=2");
    }

    #[test]
    fn test_with_token_picks_separator() {
        assert_eq!(with_token("/", "a.b.c"), "/?token=a.b.c");
        assert_eq!(with_token("/cart?x=1", "a.b.c"), "/cart?x=1&token=a.b.c");
    }
}

//! Password account route handlers.
//!
//! Registration and login return a bearer token alongside the account so the
//! client can start an authenticated cart session straight away.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update body. Absent or blank fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A bearer token and the account it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Wrapper used by endpoints that return `{ "user": ... }`.
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserProfile,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a password account.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let auth = AuthService::new(state.pool(), state.jwt());
    let (user, token) = auth
        .register(Registration {
            email: &body.email,
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    add_breadcrumb("auth", "Account registered", None);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

/// Sign in with email and password.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let auth = AuthService::new(state.pool(), state.jwt());
    let (user, token) = auth.login(&body.email, &body.password).await?;

    tracing::info!(user_id = %user.id, "Signed in with password");

    Ok(Json(AuthResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

/// The signed-in account.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.pool(), state.jwt());
    let user = auth.get_user(user.id).await?;
    Ok(Json(UserProfile::from(&user)))
}

/// Change the signed-in account's email or names.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<UserEnvelope>> {
    let auth = AuthService::new(state.pool(), state.jwt());
    let user = auth
        .update_profile(
            user.id,
            body.email.as_deref(),
            body.first_name.as_deref(),
            body.last_name.as_deref(),
        )
        .await?;

    Ok(Json(UserEnvelope {
        user: UserProfile::from(&user),
    }))
}

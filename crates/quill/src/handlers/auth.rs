//! Registration, login and the current-user endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use quill_auth::{hash_password, verify_password, AuthError, CurrentUser};
use quill_core::blog::{validate_registration, LoginRequest, PublicUser, RegisterRequest, User};
use quill_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

/// Token plus the profile it belongs to.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

fn taken(what: &str) -> RepositoryError {
    RepositoryError::AlreadyExists {
        entity_type: "User",
        id: what.to_string(),
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_registration(&req)?;

    let username = req.username.trim();
    let email = req.email.trim().to_lowercase();
    if state.users.get_user_by_email(&email).await?.is_some() {
        return Err(taken(&email).into());
    }
    if state.users.get_user_by_username(username).await?.is_some() {
        return Err(taken(username).into());
    }

    let password_hash = hash_password(&req.password)?;
    let user = User::new(username, email, password_hash);
    state.users.create_user(&user).await?;

    let token = state.auth.jwt.issue(user.id)?;
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.to_public(),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .get_user_by_email(req.email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.auth.jwt.issue(user.id)?;
    tracing::debug!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: user.to_public(),
    }))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.to_public())
}

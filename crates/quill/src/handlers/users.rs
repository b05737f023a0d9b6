//! User profile handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use quill_auth::CurrentUser;
use quill_core::blog::{can_modify_user, validate_user_update, PublicUser, UpdateUserRequest};
use quill_core::storage::RepositoryError;

use crate::{
    handlers::{error::Forbidden, AppError},
    state::AppState,
};

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| RepositoryError::user_not_found(id))?;
    Ok(Json(user.to_public()))
}

/// PUT /api/users/{id}
pub async fn update_user(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    if !can_modify_user(id, current.id) {
        return Err(Forbidden("cannot modify another user").into());
    }
    validate_user_update(&req)?;

    let mut user = current;
    req.apply_to(&mut user);
    state.users.update_user(&user).await?;

    tracing::debug!(user_id = %user.id, "Profile updated");
    Ok(Json(user.to_public()))
}

/// DELETE /api/users/{id}
///
/// Removes the user together with every post they wrote.
pub async fn delete_user(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !can_modify_user(id, current.id) {
        return Err(Forbidden("cannot delete another user").into());
    }

    let removed = state.posts.delete_posts_by_author(id).await?;
    state.users.delete_user(id).await?;

    tracing::info!(user_id = %id, posts_removed = removed, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Post CRUD handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use quill_auth::CurrentUser;
use quill_core::blog::{
    can_modify_post, validate_new_post, validate_post_update, CreatePostRequest, ListPostsQuery,
    Post, UpdatePostRequest,
};
use quill_core::storage::{Page, Pagination, PostFilter, RepositoryError};

use crate::{
    handlers::{error::Forbidden, AppError},
    state::AppState,
};

/// Loads a post the caller is allowed to change.
async fn owned_post(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Post, AppError> {
    let post = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(|| RepositoryError::post_not_found(id))?;
    if !can_modify_post(&post, user_id) {
        return Err(Forbidden("only the author can change this post").into());
    }
    Ok(post)
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Page<Post>>, AppError> {
    let pagination = Pagination::new(query.page, query.limit)?;
    let filter = PostFilter::from(&query);
    let page = state.posts.list_posts(&filter, pagination).await?;
    Ok(Json(page))
}

/// GET /api/posts/{id}
///
/// Drafts are not served here; the response is shared through the cache.
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .posts
        .get_post(id)
        .await?
        .filter(|p| p.published)
        .ok_or_else(|| RepositoryError::post_not_found(id))?;
    Ok(Json(post))
}

/// POST /api/posts
pub async fn create_post(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = validate_new_post(req)?.into_post(user.id);
    state.posts.create_post(&post).await?;

    tracing::debug!(post_id = %post.id, author_id = %user.id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let req = validate_post_update(req)?;
    let mut post = owned_post(&state, id, user.id).await?;

    req.apply_to(&mut post);
    state.posts.update_post(&post).await?;

    tracing::debug!(post_id = %post.id, "Post updated");
    Ok(Json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    owned_post(&state, id, user.id).await?;
    state.posts.delete_post(id).await?;

    tracing::debug!(post_id = %id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Axum extractors for authentication.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use quill_core::blog::User;

use crate::jwt::extract_bearer_token;
use crate::{AuthError, AuthState};

async fn resolve_user(parts: &Parts, auth_state: &AuthState) -> Result<User, AuthError> {
    let header_value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("non-ASCII authorization header".to_string()))?;

    let token = extract_bearer_token(header_value)?;
    let user_id = auth_state.jwt.validate(token)?.user_id()?;

    auth_state
        .users
        .get_user(user_id)
        .await?
        .ok_or(AuthError::UserNotFound)
}

/// Extractor for authenticated user. Returns 401 if not authenticated.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        resolve_user(parts, &auth_state).await.map(CurrentUser)
    }
}

//! Application state for auth.

use std::sync::Arc;

use axum::extract::FromRef;
use quill_core::storage::UserRepository;

use crate::config::AuthConfig;
use crate::jwt::JwtAuth;

/// Shared state for auth handlers and extractors.
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserRepository>,
    pub jwt: Arc<JwtAuth>,
}

impl AuthState {
    pub fn new(users: Arc<dyn UserRepository>, config: &AuthConfig) -> Self {
        Self {
            users,
            jwt: Arc::new(JwtAuth::new(&config.jwt_secret, config.token_expiry_hours)),
        }
    }
}

/// Allows AuthState to be extracted from a parent state.
impl<S> FromRef<S> for AuthState
where
    S: AsRef<AuthState>,
{
    fn from_ref(state: &S) -> Self {
        state.as_ref().clone()
    }
}

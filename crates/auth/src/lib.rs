//! Token authentication for quill.
//!
//! This crate provides:
//! - HS256 JWT issuance and validation
//! - Argon2 password hashing
//! - Axum extractors for the authenticated user

mod config;
mod error;
mod extractors;
mod jwt;
mod password;
mod state;

pub use config::AuthConfig;
pub use error::AuthError;
pub use extractors::CurrentUser;
pub use jwt::{extract_bearer_token, Claims, JwtAuth};
pub use password::{hash_password, verify_password};
pub use state::AuthState;

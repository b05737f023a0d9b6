//! HTTP handlers for the `/api` surface and health probes.

pub mod auth;
pub mod error;
pub mod health;
pub mod posts;
pub mod users;

pub use error::AppError;

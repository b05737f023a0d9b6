mod error;
mod operations;
mod requests;
mod types;

pub use error::ValidationError;
pub use operations::{
    can_modify_post, can_modify_user, normalize_tags, validate_email, validate_new_post,
    validate_post_update, validate_registration, validate_user_update,
};
pub use requests::{
    CreatePostRequest, ListPostsQuery, LoginRequest, RegisterRequest, UpdatePostRequest,
    UpdateUserRequest,
};
pub use types::{Post, PublicUser, User};

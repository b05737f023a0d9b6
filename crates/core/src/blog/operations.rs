//! Pure validation and authorization rules for blog requests.

use uuid::Uuid;

use super::error::ValidationError;
use super::requests::{CreatePostRequest, RegisterRequest, UpdatePostRequest, UpdateUserRequest};
use super::types::Post;

const MAX_TITLE_LEN: usize = 200;
const MAX_TAGS: usize = 10;
const MAX_TAG_LEN: usize = 30;
const MAX_BIO_LEN: usize = 500;
const MIN_PASSWORD_LEN: usize = 8;

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.trim().chars().count();
    if !(3..=32).contains(&len) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

/// Checks that an email has a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((name, tld)) if !name.is_empty() && !tld.is_empty() && !tld.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    Ok(())
}

/// Trims, lowercases and de-duplicates tags, preserving first-seen order.
///
/// Blank tags are dropped.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(ValidationError::TagTooLong(tag));
        }
        normalized.push(tag);
    }

    if normalized.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags);
    }

    Ok(normalized)
}

pub fn validate_registration(req: &RegisterRequest) -> Result<(), ValidationError> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_user_update(req: &UpdateUserRequest) -> Result<(), ValidationError> {
    if let Some(ref username) = req.username {
        validate_username(username)?;
    }
    if let Some(ref bio) = req.bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(ValidationError::BioTooLong);
        }
    }
    Ok(())
}

/// Validates a new post and returns it with normalized tags.
pub fn validate_new_post(req: CreatePostRequest) -> Result<CreatePostRequest, ValidationError> {
    validate_title(&req.title)?;
    validate_body(&req.body)?;
    let tags = normalize_tags(req.tags)?;
    Ok(CreatePostRequest { tags, ..req })
}

/// Validates a post update and returns it with normalized tags.
pub fn validate_post_update(req: UpdatePostRequest) -> Result<UpdatePostRequest, ValidationError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref body) = req.body {
        validate_body(body)?;
    }
    let tags = req.tags.map(normalize_tags).transpose()?;
    Ok(UpdatePostRequest { tags, ..req })
}

/// Only the author may change a post.
pub fn can_modify_post(post: &Post, user_id: Uuid) -> bool {
    post.author_id == user_id
}

/// Users may only change their own profile.
pub fn can_modify_user(target_id: Uuid, user_id: Uuid) -> bool {
    target_id == user_id
}

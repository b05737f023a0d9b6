use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blog::{ListPostsQuery, Post, ValidationError};

const MAX_PAGE_SIZE: u32 = 100;

/// Filter applied when listing posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
    pub tag: Option<String>,
    /// Include drafts. Listing endpoints only show published posts.
    pub include_drafts: bool,
}

impl PostFilter {
    /// Returns true if the post passes the filter.
    pub fn matches(&self, post: &Post) -> bool {
        if !self.include_drafts && !post.published {
            return false;
        }
        if let Some(author_id) = self.author_id {
            if post.author_id != author_id {
                return false;
            }
        }
        match self.tag {
            Some(ref tag) => {
                let tag = tag.trim().to_lowercase();
                post.tags.iter().any(|t| *t == tag)
            }
            None => true,
        }
    }
}

impl From<&ListPostsQuery> for PostFilter {
    fn from(query: &ListPostsQuery) -> Self {
        Self {
            author_id: query.author,
            tag: query.tag.clone(),
            include_drafts: false,
        }
    }
}

/// A validated page request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Creates a page request, validating `page >= 1` and `1 <= limit <= 100`.
    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(Self { page, limit })
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// Slices `all` according to `pagination`.
    pub fn from_vec(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();
        Self {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_validation() {
        assert_eq!(Pagination::new(0, 20), Err(ValidationError::InvalidPage));
        assert_eq!(Pagination::new(1, 0), Err(ValidationError::InvalidPageSize));
        assert_eq!(Pagination::new(1, 101), Err(ValidationError::InvalidPageSize));
        assert!(Pagination::new(3, 100).is_ok());
    }

    #[test]
    fn test_pagination_offset() {
        assert_eq!(Pagination::new(1, 20).unwrap().offset(), 0);
        assert_eq!(Pagination::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_page_from_vec() {
        let page = Page::from_vec((1..=25).collect::<Vec<_>>(), Pagination::new(2, 10).unwrap());
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);

        let past_end = Page::from_vec((1..=5).collect::<Vec<_>>(), Pagination::new(2, 10).unwrap());
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[test]
    fn test_filter_hides_drafts_and_matches_tag() {
        let author = Uuid::new_v4();
        let post = Post::new(author, "T", "B").with_tags(vec!["rust".into()]);
        let draft = Post::new(author, "T", "B").with_published(false);

        let filter = PostFilter {
            tag: Some(" Rust ".into()),
            ..Default::default()
        };
        assert!(filter.matches(&post));
        assert!(!PostFilter::default().matches(&draft));

        let other_author = PostFilter {
            author_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!other_author.matches(&post));
    }
}

//! Article model
//!
//! This module provides:
//! - `Article` entity, a read-only projection of the content store
//! - `FeaturedImage` metadata
//! - `CreateArticleInput` for seeding the projection
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::Tag;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Numeric identifier, used by the tag relation
    pub id: i64,
    /// Stable public identifier, used by the related-articles endpoint
    pub document_id: String,
    /// URL-friendly slug
    pub slug: String,
    /// Article title
    pub title: String,
    /// Short summary
    #[serde(default)]
    pub desc: Option<String>,
    /// Markdown content
    pub content: String,
    /// Tags attached to the article
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Cover image
    #[serde(default)]
    pub featured_image: Option<FeaturedImage>,
    /// Hidden from listings, tag pages and related articles
    #[serde(default)]
    pub unlisted: bool,
    /// Whether the comments section is shown
    #[serde(default = "default_commentable")]
    pub commentable: bool,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_commentable() -> bool {
    true
}

impl Article {
    /// Whether the article may appear in public listings
    pub fn is_public(&self) -> bool {
        !self.unlisted
    }

    /// Ids of the attached tags
    pub fn tag_ids(&self) -> HashSet<i64> {
        self.tags.iter().map(|t| t.id).collect()
    }

    /// Publication time as a unix timestamp, treating unpublished as the epoch
    pub fn published_timestamp(&self) -> i64 {
        self.published_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Cover image metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedImage {
    pub url: String,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Input for inserting an article into the projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    /// Public identifier; generated when absent
    #[serde(default)]
    pub document_id: Option<String>,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured_image: Option<FeaturedImage>,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default = "default_commentable")]
    pub commentable: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl CreateArticleInput {
    /// Create a new CreateArticleInput
    pub fn new(slug: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            document_id: None,
            slug: slug.into(),
            title: title.into(),
            desc: None,
            content: content.into(),
            featured_image: None,
            unlisted: false,
            commentable: true,
            published_at: None,
        }
    }

    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_featured_image(mut self, image: FeaturedImage) -> Self {
        self.featured_image = Some(image);
        self
    }

    pub fn with_unlisted(mut self, unlisted: bool) -> Self {
        self.unlisted = unlisted;
        self
    }

    pub fn with_commentable(mut self, commentable: bool) -> Self {
        self.commentable = commentable;
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// Largest page size a listing will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 12,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        page_count(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Number of pages needed to show `total` items, `per_page` at a time
pub(crate) fn page_count(total: i64, per_page: u32) -> u32 {
    if per_page == 0 || total <= 0 {
        return 0;
    }
    ((total as u64 + per_page as u64 - 1) / per_page as u64) as u32
}

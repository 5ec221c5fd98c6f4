//! Tag model
//!
//! Tags are shared across articles. The public article count is derived at
//! query time and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug, used in `/tag/{slug}` links
    pub slug: String,
    /// Display name, matched verbatim when linking tag names in content
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            slug: slug.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// Site-relative URL of the tag page
    pub fn href(&self) -> String {
        format!("/tag/{}", self.slug)
    }
}

/// Tag with the number of public (non-unlisted) articles carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub article_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, article_count: i64) -> Self {
        Self { tag, article_count }
    }
}

//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

use crate::models::{Article, FeaturedImage, ListParams, PagedResult, Tag};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Pagination query parameters; a missing page size falls back to the
/// configured one
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
}

impl PaginationQuery {
    pub fn to_params(&self, default_page_size: u32) -> ListParams {
        ListParams::new(self.page, self.page_size.unwrap_or(default_page_size))
    }
}

/// Article as shown in listings (no body)
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub document_id: String,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub tags: Vec<TagRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<FeaturedImage>,
    pub published_at: Option<String>,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            document_id: article.document_id,
            slug: article.slug,
            title: article.title,
            desc: article.desc,
            tags: article.tags.into_iter().map(TagRef::from).collect(),
            featured_image: article.featured_image,
            published_at: article.published_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Tag reference with its page link
#[derive(Debug, Serialize, Deserialize)]
pub struct TagRef {
    pub slug: String,
    pub name: String,
    pub href: String,
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        let href = tag.href();
        Self {
            slug: tag.slug,
            name: tag.name,
            href,
        }
    }
}

/// Paged article listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleSummary>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<PagedResult<Article>> for ArticleListResponse {
    fn from(result: PagedResult<Article>) -> Self {
        let total_pages = result.total_pages();
        Self {
            total: result.total,
            page: result.page,
            page_size: result.per_page,
            total_pages,
            articles: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

//! Article service
//!
//! Read-side article operations:
//! - Paged public listings, overall and per tag
//! - Article detail with tag-linked content, rendered HTML, TOC and
//!   related articles
//! - Related articles by document id
//! - Slug enumeration for static export

use crate::config::{ArticleSort, RelatedConfig};
use crate::db::repositories::{ArticleRepository, TagRepository};
use crate::models::{Article, ListParams, PagedResult, Tag};
use crate::services::markdown::{trailing_toc_entries, MarkdownRenderer, TocEntry};
use crate::services::related::{
    rank_related, RelatedArticle, DEFAULT_CANDIDATE_CAP, DEFAULT_DISPLAY_LIMIT,
};
use crate::services::tag_links::inject_tag_links;
use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Everything an article page needs.
///
/// `article.content` holds the markdown after tag-link substitution; `html`
/// is that markdown rendered.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub related: Vec<RelatedArticle>,
}

/// Article service for the public blog
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    markdown_renderer: MarkdownRenderer,
    sort: ArticleSort,
    candidate_cap: usize,
    display_limit: usize,
}

impl ArticleService {
    /// Create a new article service with default sort and related limits
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        markdown_renderer: MarkdownRenderer,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            markdown_renderer,
            sort: ArticleSort::default(),
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }

    /// Use a different listing sort
    pub fn with_sort(mut self, sort: ArticleSort) -> Self {
        self.sort = sort;
        self
    }

    /// Use configured related-article limits
    pub fn with_related_config(mut self, config: &RelatedConfig) -> Self {
        self.candidate_cap = config.candidate_cap as usize;
        self.display_limit = config.display_limit as usize;
        self
    }

    /// List public articles with pagination
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let articles = self
            .repo
            .list_public(params.offset(), params.limit(), self.sort)
            .await
            .context("Failed to list articles")?;
        let total = self
            .repo
            .count_public()
            .await
            .context("Failed to count articles")?;

        Ok(PagedResult::new(articles, total, params))
    }

    /// List public articles carrying the tag with `tag_slug`
    ///
    /// # Errors
    /// - `NotFound` if no tag has this slug
    pub async fn list_by_tag(
        &self,
        tag_slug: &str,
        params: &ListParams,
    ) -> Result<(Tag, PagedResult<Article>), ArticleServiceError> {
        let tag = self
            .tag_repo
            .get_by_slug(tag_slug)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("tag {}", tag_slug)))?;

        let articles = self
            .repo
            .list_public_by_tag(tag.id, params.offset(), params.limit(), self.sort)
            .await
            .context("Failed to list articles by tag")?;
        let total = self
            .repo
            .count_public_by_tag(tag.id)
            .await
            .context("Failed to count articles by tag")?;

        Ok((tag, PagedResult::new(articles, total, params)))
    }

    /// Get an article page by slug.
    ///
    /// Unlisted articles are still returned: they are hidden from listings
    /// but reachable by direct link.
    ///
    /// # Errors
    /// - `ValidationError` if the slug is blank
    /// - `NotFound` if no article has this slug
    pub async fn get_detail(&self, slug: &str) -> Result<ArticleDetail, ArticleServiceError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }

        let mut article = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .ok_or_else(|| ArticleServiceError::NotFound(slug.to_string()))?;

        let all_tags = self.tag_repo.list().await.context("Failed to list tags")?;
        article.content = inject_tag_links(&article.content, &all_tags);

        let related = self.find_related(&article, self.display_limit).await?;

        let rendered = self.markdown_renderer.render(&article.content);
        let mut toc = rendered.toc;
        toc.extend(trailing_toc_entries(
            !article.tags.is_empty(),
            article.commentable,
            !related.is_empty(),
        ));

        tracing::debug!(
            slug = %article.slug,
            related = related.len(),
            toc = toc.len(),
            "Built article detail"
        );

        Ok(ArticleDetail {
            article,
            html: rendered.html,
            toc,
            related,
        })
    }

    /// Related articles for the article with `document_id`
    ///
    /// # Errors
    /// - `ValidationError` if `limit` is zero
    /// - `NotFound` if no article has this document id
    pub async fn get_related(
        &self,
        document_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RelatedArticle>, ArticleServiceError> {
        let limit = limit.unwrap_or(self.display_limit);
        if limit == 0 {
            return Err(ArticleServiceError::ValidationError(
                "Limit must be at least 1".to_string(),
            ));
        }

        let source = self
            .repo
            .get_by_document_id(document_id)
            .await
            .context("Failed to get article by document id")?
            .ok_or_else(|| ArticleServiceError::NotFound(document_id.to_string()))?;

        self.find_related(&source, limit).await
    }

    /// Slugs of every article, unlisted included
    pub async fn list_slugs(&self) -> Result<Vec<String>, ArticleServiceError> {
        self.repo
            .list_slugs()
            .await
            .context("Failed to list article slugs")
            .map_err(Into::into)
    }

    /// Gather candidates sharing a tag with `source`, then rank them in memory.
    ///
    /// The candidate cap applies before unlisted articles are dropped, so a
    /// source with many unlisted neighbours can come back short.
    async fn find_related(
        &self,
        source: &Article,
        limit: usize,
    ) -> Result<Vec<RelatedArticle>, ArticleServiceError> {
        let tag_ids: Vec<i64> = source.tags.iter().map(|t| t.id).collect();
        if tag_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .repo
            .related_candidates(source.id, &tag_ids, self.candidate_cap as i64)
            .await
            .context("Failed to gather related candidates")?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = candidates.iter().map(|(id, _)| *id).collect();
        let position: HashMap<i64, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut articles = self
            .repo
            .get_by_ids(&ids)
            .await
            .context("Failed to load related candidates")?;
        articles.sort_by_key(|a| position.get(&a.id).copied().unwrap_or(usize::MAX));

        Ok(rank_related(source, articles, limit))
    }
}

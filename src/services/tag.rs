//! Tag service
//!
//! Read-side tag operations:
//! - Every tag, for the tag-link substitution pass
//! - Tag cloud with public article counts
//! - Tag lookup by slug

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount};
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for reading blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Every tag, ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Get tag cloud
    ///
    /// Only tags with at least one public article are included. Sorted by
    /// article count descending, ties broken by name.
    pub async fn get_tag_cloud(&self) -> Result<Vec<TagWithCount>, TagServiceError> {
        let mut tags = self
            .repo
            .list_with_counts()
            .await
            .context("Failed to get tag cloud")?;

        tags.retain(|t| t.article_count > 0);
        tags.sort_by(|a, b| {
            b.article_count
                .cmp(&a.article_count)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });

        Ok(tags)
    }

    /// Get a tag by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get tag by slug")?
            .ok_or_else(|| TagServiceError::NotFound(slug.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{ArticleRepository, SqlxArticleRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::CreateArticleInput;

    async fn setup_test_service() -> (DynDatabasePool, TagService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxTagRepository::boxed(pool.clone());
        let service = TagService::new(repo);

        (pool, service)
    }

    async fn tagged_article(pool: &DynDatabasePool, slug: &str, unlisted: bool, tags: &[&Tag]) {
        let articles = SqlxArticleRepository::new(pool.clone());
        let tag_repo = SqlxTagRepository::new(pool.clone());

        let article = articles
            .create(&CreateArticleInput::new(slug, slug, "body").with_unlisted(unlisted))
            .await
            .expect("Failed to create article");
        for tag in tags {
            tag_repo
                .add_to_article(tag.id, article.id)
                .await
                .expect("Failed to tag article");
        }
    }

    async fn create_tag(pool: &DynDatabasePool, slug: &str, name: &str) -> Tag {
        SqlxTagRepository::new(pool.clone())
            .create(&Tag::new(slug, name))
            .await
            .expect("Failed to create tag")
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (_pool, service) = setup_test_service().await;
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_all_tags() {
        let (pool, service) = setup_test_service().await;
        create_tag(&pool, "rust", "Rust").await;
        create_tag(&pool, "go", "Go").await;

        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Go", "Rust"]);
    }

    #[tokio::test]
    async fn test_get_by_slug_found() {
        let (pool, service) = setup_test_service().await;
        create_tag(&pool, "rust", "Rust").await;

        let tag = service.get_by_slug("rust").await.unwrap();
        assert_eq!(tag.name, "Rust");
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found() {
        let (_pool, service) = setup_test_service().await;

        let result = service.get_by_slug("missing").await;
        assert!(matches!(result, Err(TagServiceError::NotFound(s)) if s == "missing"));
    }

    #[tokio::test]
    async fn test_get_tag_cloud_no_articles() {
        let (pool, service) = setup_test_service().await;
        create_tag(&pool, "rust", "Rust").await;

        assert!(service.get_tag_cloud().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_tag_cloud_orders_by_public_count_then_name() {
        let (pool, service) = setup_test_service().await;
        let rust = create_tag(&pool, "rust", "Rust").await;
        let go = create_tag(&pool, "go", "Go").await;
        let axum = create_tag(&pool, "axum", "Axum").await;
        let hidden = create_tag(&pool, "hidden", "Hidden").await;

        tagged_article(&pool, "a", false, &[&rust, &go]).await;
        tagged_article(&pool, "b", false, &[&rust, &axum]).await;
        tagged_article(&pool, "c", false, &[&go]).await;
        tagged_article(&pool, "d", true, &[&axum, &hidden]).await;

        let cloud = service.get_tag_cloud().await.unwrap();
        let summary: Vec<(&str, i64)> = cloud
            .iter()
            .map(|t| (t.tag.slug.as_str(), t.article_count))
            .collect();

        assert_eq!(summary, vec![("go", 2), ("rust", 2), ("axum", 1)]);
    }
}

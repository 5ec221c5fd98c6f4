//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite
//!
//! Every article handed out by the repository has its tags populated.

use crate::config::ArticleSort;
use crate::db::DynDatabasePool;
use crate::models::{Article, CreateArticleInput, FeaturedImage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use super::tag::get_tags_by_articles;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article (without tags)
    async fn create(&self, input: &CreateArticleInput) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug, unlisted articles included
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Get article by its public document id
    async fn get_by_document_id(&self, document_id: &str) -> Result<Option<Article>>;

    /// Fetch several articles by id, in no particular order
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>>;

    /// List public (non-unlisted) articles with pagination
    async fn list_public(&self, offset: i64, limit: i64, sort: ArticleSort) -> Result<Vec<Article>>;

    /// Count public articles
    async fn count_public(&self) -> Result<i64>;

    /// List public articles carrying a tag
    async fn list_public_by_tag(
        &self,
        tag_id: i64,
        offset: i64,
        limit: i64,
        sort: ArticleSort,
    ) -> Result<Vec<Article>>;

    /// Count public articles carrying a tag
    async fn count_public_by_tag(&self, tag_id: i64) -> Result<i64>;

    /// Slugs of every article, unlisted included
    async fn list_slugs(&self) -> Result<Vec<String>>;

    /// Articles sharing at least one of `tag_ids`, excluding `article_id`.
    ///
    /// Returns `(article_id, matching_tag_count)` pairs ordered by count
    /// descending and capped at `cap`. Unlisted articles are not filtered
    /// here.
    async fn related_candidates(
        &self,
        article_id: i64,
        tag_ids: &[i64],
        cap: i64,
    ) -> Result<Vec<(i64, i64)>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, input: &CreateArticleInput) -> Result<Article> {
        create_article(self.pool.sqlite(), input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        get_article_by(self.pool.sqlite(), ArticleKey::Id(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        get_article_by(self.pool.sqlite(), ArticleKey::Slug(slug)).await
    }

    async fn get_by_document_id(&self, document_id: &str) -> Result<Option<Article>> {
        get_article_by(self.pool.sqlite(), ArticleKey::DocumentId(document_id)).await
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        get_articles_by_ids(self.pool.sqlite(), ids).await
    }

    async fn list_public(&self, offset: i64, limit: i64, sort: ArticleSort) -> Result<Vec<Article>> {
        list_public_articles(self.pool.sqlite(), None, offset, limit, sort).await
    }

    async fn count_public(&self) -> Result<i64> {
        count_public_articles(self.pool.sqlite(), None).await
    }

    async fn list_public_by_tag(
        &self,
        tag_id: i64,
        offset: i64,
        limit: i64,
        sort: ArticleSort,
    ) -> Result<Vec<Article>> {
        list_public_articles(self.pool.sqlite(), Some(tag_id), offset, limit, sort).await
    }

    async fn count_public_by_tag(&self, tag_id: i64) -> Result<i64> {
        count_public_articles(self.pool.sqlite(), Some(tag_id)).await
    }

    async fn list_slugs(&self) -> Result<Vec<String>> {
        list_article_slugs(self.pool.sqlite()).await
    }

    async fn related_candidates(
        &self,
        article_id: i64,
        tag_ids: &[i64],
        cap: i64,
    ) -> Result<Vec<(i64, i64)>> {
        find_related_candidates(self.pool.sqlite(), article_id, tag_ids, cap).await
    }
}

const ARTICLE_COLUMNS: &str = "a.id, a.document_id, a.slug, a.title, a.description, a.content, \
     a.featured_image, a.unlisted, a.commentable, a.published_at, a.created_at, a.updated_at";

async fn create_article(pool: &SqlitePool, input: &CreateArticleInput) -> Result<Article> {
    let now = Utc::now();
    let document_id = input
        .document_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let featured_image = input
        .featured_image
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to encode featured image")?;

    let result = sqlx::query(
        r#"
        INSERT INTO articles (document_id, slug, title, description, content, featured_image, unlisted, commentable, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document_id)
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&input.desc)
    .bind(&input.content)
    .bind(&featured_image)
    .bind(input.unlisted)
    .bind(input.commentable)
    .bind(input.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        document_id,
        slug: input.slug.clone(),
        title: input.title.clone(),
        desc: input.desc.clone(),
        content: input.content.clone(),
        tags: Vec::new(),
        featured_image: input.featured_image.clone(),
        unlisted: input.unlisted,
        commentable: input.commentable,
        published_at: input.published_at,
        created_at: now,
        updated_at: now,
    })
}

/// Unique lookup keys for a single article
#[derive(Clone, Copy)]
enum ArticleKey<'a> {
    Id(i64),
    Slug(&'a str),
    DocumentId(&'a str),
}

impl ArticleKey<'_> {
    fn column(&self) -> &'static str {
        match self {
            ArticleKey::Id(_) => "id",
            ArticleKey::Slug(_) => "slug",
            ArticleKey::DocumentId(_) => "document_id",
        }
    }
}

async fn get_article_by(pool: &SqlitePool, key: ArticleKey<'_>) -> Result<Option<Article>> {
    let sql = format!(
        "SELECT {} FROM articles a WHERE a.{} = ?",
        ARTICLE_COLUMNS,
        key.column()
    );
    let query = sqlx::query(&sql);
    let query = match key {
        ArticleKey::Id(id) => query.bind(id),
        ArticleKey::Slug(value) | ArticleKey::DocumentId(value) => query.bind(value),
    };

    let row = query
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get article by {}", key.column()))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut articles = vec![row_to_article(&row)?];
    attach_tags(pool, &mut articles).await?;
    Ok(articles.pop())
}

async fn get_articles_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Article>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM articles a WHERE a.id IN (",
        ARTICLE_COLUMNS
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to get articles by ids")?;

    let mut articles = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
    attach_tags(pool, &mut articles).await?;
    Ok(articles)
}

async fn list_public_articles(
    pool: &SqlitePool,
    tag_id: Option<i64>,
    offset: i64,
    limit: i64,
    sort: ArticleSort,
) -> Result<Vec<Article>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM articles a ", ARTICLE_COLUMNS));
    if let Some(tag_id) = tag_id {
        qb.push("INNER JOIN article_tags at ON a.id = at.article_id AND at.tag_id = ");
        qb.push_bind(tag_id);
        qb.push(" ");
    }
    qb.push("WHERE a.unlisted = 0 ORDER BY ");
    qb.push(sort.order_by());
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list public articles")?;

    let mut articles = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
    attach_tags(pool, &mut articles).await?;
    Ok(articles)
}

async fn count_public_articles(pool: &SqlitePool, tag_id: Option<i64>) -> Result<i64> {
    let count: i64 = match tag_id {
        Some(tag_id) => sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM articles a
            INNER JOIN article_tags at ON a.id = at.article_id
            WHERE at.tag_id = ? AND a.unlisted = 0
            "#,
        )
        .bind(tag_id)
        .fetch_one(pool)
        .await
        .context("Failed to count public articles by tag")?,
        None => sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE unlisted = 0")
            .fetch_one(pool)
            .await
            .context("Failed to count public articles")?,
    };

    Ok(count)
}

async fn list_article_slugs(pool: &SqlitePool) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT slug FROM articles ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list article slugs")
}

async fn find_related_candidates(
    pool: &SqlitePool,
    article_id: i64,
    tag_ids: &[i64],
    cap: i64,
) -> Result<Vec<(i64, i64)>> {
    if tag_ids.is_empty() || cap <= 0 {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT at.article_id, COUNT(at.tag_id) AS matching_tags \
         FROM article_tags at \
         WHERE at.tag_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in tag_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") AND at.article_id <> ");
    qb.push_bind(article_id);
    qb.push(" GROUP BY at.article_id ORDER BY matching_tags DESC, at.article_id ASC LIMIT ");
    qb.push_bind(cap);

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to gather related article candidates")?;

    rows.iter()
        .map(|row| -> Result<(i64, i64)> {
            Ok((row.try_get("article_id")?, row.try_get("matching_tags")?))
        })
        .collect()
}

/// Populate `tags` on every article with one query
async fn attach_tags(pool: &SqlitePool, articles: &mut [Article]) -> Result<()> {
    let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
    let mut tags = get_tags_by_articles(pool, &ids).await?;

    for article in articles.iter_mut() {
        article.tags = tags.remove(&article.id).unwrap_or_default();
    }
    Ok(())
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let featured_image: Option<String> = row.try_get("featured_image")?;
    let featured_image = featured_image
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| serde_json::from_str::<FeaturedImage>(&raw))
        .transpose()
        .context("Invalid featured image JSON")?;

    Ok(Article {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        desc: row.try_get("description")?,
        content: row.try_get("content")?,
        tags: Vec::new(),
        featured_image,
        unlisted: row.try_get("unlisted")?,
        commentable: row.try_get("commentable")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

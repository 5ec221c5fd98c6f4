//! Tag repository
//!
//! Database operations for tags and the article/tag relation.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// List all tags, ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// List all tags with the number of public articles carrying each
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>>;

    /// Associate tag with article
    async fn add_to_article(&self, tag_id: i64, article_id: i64) -> Result<()>;

    /// Get tags for an article
    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>>;

    /// Get tags for several articles at once, keyed by article id
    async fn get_by_article_ids(&self, article_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        create_tag(self.pool.sqlite(), tag).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        get_tag_by_slug(self.pool.sqlite(), slug).await
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        list_tags(self.pool.sqlite()).await
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>> {
        list_tags_with_counts(self.pool.sqlite()).await
    }

    async fn add_to_article(&self, tag_id: i64, article_id: i64) -> Result<()> {
        add_tag_to_article(self.pool.sqlite(), tag_id, article_id).await
    }

    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>> {
        get_tags_by_article(self.pool.sqlite(), article_id).await
    }

    async fn get_by_article_ids(&self, article_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        get_tags_by_articles(self.pool.sqlite(), article_ids).await
    }
}

async fn create_tag(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (slug, name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.slug)
    .bind(&tag.name)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn get_tag_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(
        r#"
        SELECT id, slug, name, created_at
        FROM tags
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag by slug")?;

    row.as_ref().map(row_to_tag).transpose()
}

async fn list_tags(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT id, slug, name, created_at
        FROM tags
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    rows.iter().map(row_to_tag).collect()
}

/// Tags with public article counts; unlisted articles do not count
async fn list_tags_with_counts(pool: &SqlitePool) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at, COUNT(a.id) AS article_count
        FROM tags t
        LEFT JOIN article_tags at ON t.id = at.tag_id
        LEFT JOIN articles a ON a.id = at.article_id AND a.unlisted = 0
        GROUP BY t.id, t.slug, t.name, t.created_at
        ORDER BY t.name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to get tags with counts")?;

    rows.iter()
        .map(|row| -> Result<TagWithCount> {
            let tag = row_to_tag(row)?;
            let article_count: i64 = row.get("article_count");
            Ok(TagWithCount::new(tag, article_count))
        })
        .collect()
}

async fn add_tag_to_article(pool: &SqlitePool, tag_id: i64, article_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
        .bind(article_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to article")?;

    Ok(())
}

async fn get_tags_by_article(pool: &SqlitePool, article_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags by article")?;

    rows.iter().map(row_to_tag).collect()
}

pub(super) async fn get_tags_by_articles(
    pool: &SqlitePool,
    article_ids: &[i64],
) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut by_article: HashMap<i64, Vec<Tag>> = HashMap::new();
    if article_ids.is_empty() {
        return Ok(by_article);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT at.article_id, t.id, t.slug, t.name, t.created_at \
         FROM tags t \
         INNER JOIN article_tags at ON t.id = at.tag_id \
         WHERE at.article_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in article_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY t.name");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to get tags for articles")?;

    for row in &rows {
        let article_id: i64 = row.get("article_id");
        by_article.entry(article_id).or_default().push(row_to_tag(row)?);
    }

    Ok(by_article)
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

//! Article API endpoints
//!
//! Handles HTTP requests for public articles:
//! - GET /api/v1/articles - List public articles with pagination
//! - GET /api/v1/articles/{slug} - Article page by slug
//! - GET /api/v1/articles/{document_id}/related - Related articles

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{ArticleListResponse, ArticleSummary, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::services::article::ArticleDetail;
use crate::services::related::RelatedArticle;

/// Query parameters for related articles
#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
}

/// One related article with its overlap count
#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedArticleResponse {
    #[serde(flatten)]
    pub article: ArticleSummary,
    pub matching_tags: usize,
}

impl From<RelatedArticle> for RelatedArticleResponse {
    fn from(related: RelatedArticle) -> Self {
        Self {
            article: related.article.into(),
            matching_tags: related.matching_tags,
        }
    }
}

/// Response for related articles
#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedListResponse {
    pub articles: Vec<RelatedArticleResponse>,
}

/// Build the articles router.
///
/// Both item routes share the `{key}` segment: a slug for the page, a
/// document id for related articles.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles))
        .route("/{key}", get(get_article))
        .route("/{key}/related", get(get_related))
}

/// GET /api/v1/articles - List public articles with pagination
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let params = query.to_params(state.page_size);
    let result = state.article_service.list_published(&params).await?;

    Ok(Json(result.into()))
}

/// GET /api/v1/articles/{slug} - Article page
///
/// Unlisted articles are served too; they are only hidden from listings.
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let detail = state.article_service.get_detail(&slug).await?;
    Ok(Json(detail))
}

/// GET /api/v1/articles/{document_id}/related - Related articles
pub async fn get_related(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<RelatedListResponse>, ApiError> {
    let related = state
        .article_service
        .get_related(&document_id, query.limit)
        .await?;

    Ok(Json(RelatedListResponse {
        articles: related.into_iter().map(Into::into).collect(),
    }))
}

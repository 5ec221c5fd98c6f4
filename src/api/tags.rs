//! Tag API endpoints
//!
//! Handles HTTP requests for tags:
//! - GET /api/v1/tags - Tag cloud, or every tag with `all=true`
//! - GET /api/v1/tags/{slug} - Tag with its public articles

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{ArticleListResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};

/// Query parameters for tag list
#[derive(Debug, Deserialize)]
pub struct ListTagsQuery {
    /// If true, return every tag instead of the cloud
    #[serde(default)]
    pub all: bool,
}

/// Response for tag list
#[derive(Debug, Serialize, Deserialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

/// Response for a single tag
#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_count: Option<i64>,
}

impl From<crate::models::Tag> for TagResponse {
    fn from(tag: crate::models::Tag) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name: tag.name,
            article_count: None,
        }
    }
}

impl From<crate::models::TagWithCount> for TagResponse {
    fn from(twc: crate::models::TagWithCount) -> Self {
        Self {
            id: twc.tag.id,
            slug: twc.tag.slug,
            name: twc.tag.name,
            article_count: Some(twc.article_count),
        }
    }
}

/// Response for a tag page
#[derive(Debug, Serialize, Deserialize)]
pub struct TagPageResponse {
    pub tag: TagResponse,
    #[serde(flatten)]
    pub listing: ArticleListResponse,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{slug}", get(get_tag))
}

/// GET /api/v1/tags - Tag cloud or full tag list
async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<ListTagsQuery>,
) -> Result<Json<TagListResponse>, ApiError> {
    let tags = if query.all {
        let list = state.tag_service.list().await?;
        list.into_iter().map(TagResponse::from).collect()
    } else {
        let cloud = state.tag_service.get_tag_cloud().await?;
        cloud.into_iter().map(TagResponse::from).collect()
    };

    Ok(Json(TagListResponse { tags }))
}

/// GET /api/v1/tags/{slug} - Tag with its public articles
async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<TagPageResponse>, ApiError> {
    let params = query.to_params(state.page_size);
    let (tag, result) = state.article_service.list_by_tag(&slug, &params).await?;

    Ok(Json(TagPageResponse {
        tag: tag.into(),
        listing: result.into(),
    }))
}

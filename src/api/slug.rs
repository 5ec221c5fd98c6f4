//! Slug API endpoint
//!
//! - POST /api/v1/slug - Transliterate a title into a pinyin slug

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::services::slug::pinyin_slug;

#[derive(Debug, Deserialize)]
pub struct SlugRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlugResponse {
    pub slug: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(generate_slug))
}

/// POST /api/v1/slug
async fn generate_slug(Json(body): Json<SlugRequest>) -> Result<Json<SlugResponse>, ApiError> {
    let slug = pinyin_slug(&body.text)?;
    Ok(Json(SlugResponse { slug }))
}

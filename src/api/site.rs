//! Site API endpoints
//!
//! - GET /api/v1/site/static-params - Export parameters for the static front end
//! - GET /sitemap.xml
//! - GET /robots.txt

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::site::StaticParams;

/// Build the site router, nested under /api/v1/site
pub fn router() -> Router<AppState> {
    Router::new().route("/static-params", get(static_params))
}

/// Routes served from the site root
pub fn crawler_router() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

/// GET /api/v1/site/static-params
async fn static_params(State(state): State<AppState>) -> Result<Json<StaticParams>, ApiError> {
    let params = state.site_service.static_params().await?;
    Ok(Json(params))
}

/// GET /sitemap.xml
async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let xml = state.site_service.sitemap_xml().await?;
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}

/// GET /robots.txt
async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.site_service.robots_txt(),
    )
}

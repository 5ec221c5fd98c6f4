//! API layer - HTTP handlers and routing
//!
//! This module contains the public HTTP endpoints:
//! - Article API endpoints
//! - Tag API endpoints
//! - Site endpoints (static export params, sitemap, robots.txt)
//! - Slug generation
//! - Health check

pub mod articles;
pub mod common;
pub mod middleware;
pub mod site;
pub mod slug;
pub mod tags;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the /api/v1 router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/articles", articles::router())
        .nest("/tags", tags::router())
        .nest("/site", site::router())
        .nest("/slug", slug::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin: {}", cors_origin),
    }

    Router::new()
        .nest("/api/v1", build_api_router())
        .merge(site::crawler_router())
        .route("/health", get(health))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness with a database ping
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxTagRepository, TagRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateArticleInput, Tag};
    use crate::services::{ArticleService, MarkdownRenderer, SiteService, TagService};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> (DynDatabasePool, Router) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());

        let state = AppState {
            pool: pool.clone(),
            article_service: Arc::new(ArticleService::new(
                article_repo.clone(),
                tag_repo.clone(),
                MarkdownRenderer::new(),
            )),
            tag_service: Arc::new(TagService::new(tag_repo.clone())),
            site_service: Arc::new(SiteService::new(
                article_repo,
                tag_repo,
                "https://blog.example.com",
                12,
            )),
            page_size: 12,
        };

        (pool, build_router(state, "http://localhost:3000"))
    }

    async fn seed(pool: &DynDatabasePool) {
        let articles = SqlxArticleRepository::new(pool.clone());
        let tags = SqlxTagRepository::new(pool.clone());

        let rust = tags.create(&Tag::new("rust", "Rust")).await.unwrap();
        let web = tags.create(&Tag::new("web", "Web")).await.unwrap();

        let hello = articles
            .create(
                &CreateArticleInput::new("hello", "Hello", "I write Rust.\n\n## Next")
                    .with_document_id("doc-hello")
                    .with_published_at(Utc::now() - Duration::days(1)),
            )
            .await
            .unwrap();
        let web_post = articles
            .create(
                &CreateArticleInput::new("web-in-rust", "Web in Rust", "axum")
                    .with_published_at(Utc::now() - Duration::days(2)),
            )
            .await
            .unwrap();
        let hidden = articles
            .create(&CreateArticleInput::new("hidden", "Hidden", "shh").with_unlisted(true))
            .await
            .unwrap();

        tags.add_to_article(rust.id, hello.id).await.unwrap();
        tags.add_to_article(rust.id, web_post.id).await.unwrap();
        tags.add_to_article(web.id, web_post.id).await.unwrap();
        tags.add_to_article(rust.id, hidden.id).await.unwrap();
    }

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, "GET", uri, Body::empty()).await;
        (status, serde_json::from_str(&body).expect("json body"))
    }

    #[tokio::test]
    async fn test_health() {
        let (_pool, app) = test_app().await;
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_articles() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, body) = get_json(app, "/api/v1/articles?page=1&page_size=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["articles"][0]["slug"], "hello");
        assert_eq!(body["articles"][0]["tags"][0]["href"], "/tag/rust");
    }

    #[tokio::test]
    async fn test_article_detail() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, body) = get_json(app, "/api/v1/articles/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "hello");
        assert_eq!(body["content"], "I write [Rust](/tag/rust).\n\n## Next");
        assert!(body["html"].as_str().unwrap().contains("<h2 id=\"next\">"));
        assert_eq!(body["toc"][0]["id"], "next");
        assert_eq!(body["related"][0]["slug"], "web-in-rust");
        assert_eq!(body["related"][0]["matching_tags"], 1);
    }

    #[tokio::test]
    async fn test_article_not_found() {
        let (_pool, app) = test_app().await;
        let (status, body) = get_json(app, "/api/v1/articles/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_related_articles() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, body) = get_json(app.clone(), "/api/v1/articles/doc-hello/related?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        let articles = body["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0]["slug"], "web-in-rust");

        let (status, _) = get_json(app, "/api/v1/articles/doc-hello/related?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tags() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, body) = get_json(app.clone(), "/api/v1/tags").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tags"][0]["slug"], "rust");
        assert_eq!(body["tags"][0]["article_count"], 2);

        let (_, body) = get_json(app.clone(), "/api/v1/tags?all=true").await;
        assert_eq!(body["tags"].as_array().unwrap().len(), 2);
        assert!(body["tags"][0].get("article_count").is_none());

        let (status, body) = get_json(app.clone(), "/api/v1/tags/web").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tag"]["name"], "Web");
        assert_eq!(body["total"], 1);
        assert_eq!(body["articles"][0]["slug"], "web-in-rust");

        let (status, _) = get_json(app, "/api/v1/tags/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_params() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, body) = get_json(app, "/api/v1/site/static-params").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["article_pages"], json!([1]));
        assert_eq!(body["article_slugs"], json!(["hello", "web-in-rust", "hidden"]));
        assert_eq!(body["tag_slugs"], json!(["rust", "web"]));
    }

    #[tokio::test]
    async fn test_sitemap_and_robots() {
        let (pool, app) = test_app().await;
        seed(&pool).await;

        let (status, xml) = send(app.clone(), "GET", "/sitemap.xml", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(xml.contains("https://blog.example.com/article/hello"));
        assert!(!xml.contains("/article/hidden"));

        let (status, robots) = send(app, "GET", "/robots.txt", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(robots.contains("Sitemap: https://blog.example.com/sitemap.xml"));
    }

    #[tokio::test]
    async fn test_slug_endpoint() {
        let (_pool, app) = test_app().await;

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/v1/slug",
            Body::from(r#"{"text":"Rust 基础教程"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["slug"], "rust-ji-chu-jiao-cheng");

        let (status, _) = send(app, "POST", "/api/v1/slug", Body::from(r#"{"text":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

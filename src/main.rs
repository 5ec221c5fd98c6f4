//! Inkstone - content API for a bilingual blog

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkstone::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxArticleRepository, SqlxTagRepository},
    },
    services::{
        article::ArticleService, markdown::MarkdownRenderer, site::SiteService, tag::TagService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkstone=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inkstone...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());

    // Initialize services
    let markdown_renderer = MarkdownRenderer::new().with_toc_levels(&config.site.toc_levels);
    let article_service = Arc::new(
        ArticleService::new(article_repo.clone(), tag_repo.clone(), markdown_renderer)
            .with_sort(config.site.sort)
            .with_related_config(&config.related),
    );
    let tag_service = Arc::new(TagService::new(tag_repo.clone()));
    let site_service = Arc::new(SiteService::new(
        article_repo,
        tag_repo,
        config.site.url.clone(),
        config.site.page_size,
    ));

    let state = AppState {
        pool: pool.clone(),
        article_service,
        tag_service,
        site_service,
        page_size: config.site.page_size,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(inkstone::shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

//! Site-wide outputs for the static front end
//!
//! - Static export parameters (listing pages, article slugs, tag pages)
//! - sitemap.xml
//! - robots.txt

use crate::config::ArticleSort;
use crate::db::repositories::{ArticleRepository, TagRepository};
use crate::models::{page_count, ListParams, TagWithCount};
use anyhow::{Context, Result};
use futures::try_join;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// One `/tag/{slug}/page/{page}` export path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagPageParam {
    pub slug: String,
    pub page: u32,
}

/// Every path parameter the static front end needs to pre-render
#[derive(Debug, Clone, Default, Serialize)]
pub struct StaticParams {
    /// Listing page numbers, starting at 1
    pub article_pages: Vec<u32>,
    /// Every article slug, unlisted included
    pub article_slugs: Vec<String>,
    /// Tags with at least one public article
    pub tag_slugs: Vec<String>,
    pub tag_pages: Vec<TagPageParam>,
}

/// Builds static params, the sitemap and robots.txt
pub struct SiteService {
    article_repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    site_url: String,
    page_size: u32,
}

impl SiteService {
    /// `page_size` is clamped the same way listing requests are, so exported
    /// page numbers match what the listing endpoints serve.
    pub fn new(
        article_repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        site_url: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            article_repo,
            tag_repo,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            page_size: ListParams::new(1, page_size).per_page,
        }
    }

    /// Collect export parameters.
    ///
    /// The public article count, the slug list and the per-tag public counts
    /// are fetched concurrently; tag pages are derived from those counts.
    pub async fn static_params(&self) -> Result<StaticParams> {
        let (total, article_slugs, tags) = try_join!(
            async {
                self.article_repo
                    .count_public()
                    .await
                    .context("Failed to count public articles")
            },
            async {
                self.article_repo
                    .list_slugs()
                    .await
                    .context("Failed to list article slugs")
            },
            async {
                self.tag_repo
                    .list_with_counts()
                    .await
                    .context("Failed to count articles per tag")
            },
        )?;

        let article_pages = (1..=page_count(total, self.page_size)).collect();
        let tags: Vec<TagWithCount> = tags.into_iter().filter(|t| t.article_count > 0).collect();
        let tag_pages = self.tag_pages(&tags);
        let tag_slugs: Vec<String> = tags.into_iter().map(|t| t.tag.slug).collect();

        tracing::info!(
            articles = total,
            slugs = article_slugs.len(),
            tags = tag_slugs.len(),
            tag_pages = tag_pages.len(),
            "Generated static params"
        );

        Ok(StaticParams {
            article_pages,
            article_slugs,
            tag_slugs,
            tag_pages,
        })
    }

    fn tag_pages(&self, tags: &[TagWithCount]) -> Vec<TagPageParam> {
        tags.iter()
            .flat_map(|t| {
                (1..=page_count(t.article_count, self.page_size)).map(move |page| TagPageParam {
                    slug: t.tag.slug.clone(),
                    page,
                })
            })
            .collect()
    }

    /// Render sitemap.xml: home, the blog index and every public article
    pub async fn sitemap_xml(&self) -> Result<String> {
        let total = self.article_repo.count_public().await?;
        let articles = self
            .article_repo
            .list_public(0, total.max(1), ArticleSort::PublishedDesc)
            .await
            .context("Failed to list articles for sitemap")?;

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        push_url(&mut xml, &self.site_url, None, Some(("yearly", "1")));
        push_url(
            &mut xml,
            &format!("{}/blog", self.site_url),
            None,
            Some(("weekly", "0.5")),
        );
        for article in &articles {
            let lastmod = article.published_at.map(|t| t.to_rfc3339());
            push_url(
                &mut xml,
                &format!("{}/article/{}", self.site_url, article.slug),
                lastmod.as_deref(),
                None,
            );
        }
        xml.push_str("</urlset>\n");

        Ok(xml)
    }

    /// Render robots.txt pointing crawlers at the sitemap
    pub fn robots_txt(&self) -> String {
        format!(
            "User-Agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
            self.site_url
        )
    }
}

fn push_url(xml: &mut String, loc: &str, lastmod: Option<&str>, freq: Option<(&str, &str)>) {
    xml.push_str("  <url>\n");
    let _ = writeln!(xml, "    <loc>{}</loc>", xml_escape(loc));
    if let Some(lastmod) = lastmod {
        let _ = writeln!(xml, "    <lastmod>{}</lastmod>", lastmod);
    }
    if let Some((changefreq, priority)) = freq {
        let _ = writeln!(xml, "    <changefreq>{}</changefreq>", changefreq);
        let _ = writeln!(xml, "    <priority>{}</priority>", priority);
    }
    xml.push_str("  </url>\n");
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateArticleInput, Tag};
    use chrono::{TimeZone, Utc};

    async fn setup(page_size: u32) -> (DynDatabasePool, SiteService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = SiteService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            "https://blog.example.com/",
            page_size,
        );
        (pool, service)
    }

    async fn seed(pool: &DynDatabasePool, slug: &str, unlisted: bool, tags: &[&Tag]) {
        let article = SqlxArticleRepository::new(pool.clone())
            .create(
                &CreateArticleInput::new(slug, slug, "body")
                    .with_unlisted(unlisted)
                    .with_published_at(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            )
            .await
            .expect("Failed to create article");
        let tag_repo = SqlxTagRepository::new(pool.clone());
        for tag in tags {
            tag_repo.add_to_article(tag.id, article.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_static_params_empty_site() {
        let (_pool, service) = setup(12).await;

        let params = service.static_params().await.unwrap();
        assert!(params.article_pages.is_empty());
        assert!(params.article_slugs.is_empty());
        assert!(params.tag_slugs.is_empty());
        assert!(params.tag_pages.is_empty());
    }

    #[tokio::test]
    async fn test_static_params() {
        let (pool, service) = setup(2).await;
        let tag_repo = SqlxTagRepository::new(pool.clone());
        let rust = tag_repo.create(&Tag::new("rust", "Rust")).await.unwrap();
        let go = tag_repo.create(&Tag::new("go", "Go")).await.unwrap();
        let draft = tag_repo.create(&Tag::new("draft", "Draft")).await.unwrap();

        seed(&pool, "a", false, &[&rust, &go]).await;
        seed(&pool, "b", false, &[&rust]).await;
        seed(&pool, "c", false, &[&rust]).await;
        seed(&pool, "d", true, &[&draft]).await;

        let params = service.static_params().await.unwrap();
        assert_eq!(params.article_pages, vec![1, 2]);
        assert_eq!(params.article_slugs, vec!["a", "b", "c", "d"]);
        assert_eq!(params.tag_slugs, vec!["go", "rust"]);

        let pages: Vec<(&str, u32)> = params
            .tag_pages
            .iter()
            .map(|p| (p.slug.as_str(), p.page))
            .collect();
        assert_eq!(pages, vec![("go", 1), ("rust", 1), ("rust", 2)]);
    }

    #[tokio::test]
    async fn test_static_params_use_listing_page_size() {
        let (pool, service) = setup(150).await;
        let rust = SqlxTagRepository::new(pool.clone())
            .create(&Tag::new("rust", "Rust"))
            .await
            .unwrap();
        for i in 0..250 {
            seed(&pool, &format!("post-{}", i), false, &[&rust]).await;
        }

        let listing_pages = page_count(250, ListParams::new(1, 150).per_page);
        assert_eq!(listing_pages, 3);

        let params = service.static_params().await.unwrap();
        assert_eq!(params.article_pages, vec![1, 2, 3]);
        let rust_pages: Vec<u32> = params.tag_pages.iter().map(|p| p.page).collect();
        assert_eq!(rust_pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sitemap_lists_public_articles() {
        let (pool, service) = setup(12).await;
        seed(&pool, "hello", false, &[]).await;
        seed(&pool, "secret", true, &[]).await;

        let xml = service.sitemap_xml().await.unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://blog.example.com</loc>"));
        assert!(xml.contains("<changefreq>yearly</changefreq>"));
        assert!(xml.contains("<loc>https://blog.example.com/blog</loc>"));
        assert!(xml.contains("<loc>https://blog.example.com/article/hello</loc>"));
        assert!(xml.contains("<lastmod>2024-05-01T08:00:00+00:00</lastmod>"));
        assert!(!xml.contains("secret"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }

    #[tokio::test]
    async fn test_robots_txt() {
        let (_pool, service) = setup(12).await;
        let robots = service.robots_txt();
        assert!(robots.contains("Allow: /"));
        assert!(robots.ends_with("Sitemap: https://blog.example.com/sitemap.xml\n"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>"), "a&amp;b&lt;c&gt;");
    }
}

//! Services layer - Business logic
//!
//! This module contains the read-side services behind the public API:
//! - Article listings, article pages and related articles
//! - Tag listings and the tag cloud
//! - Static export parameters, sitemap and robots.txt
//! - The pure transforms they build on (ranking, tag links, slugs, markdown)

pub mod article;
pub mod markdown;
pub mod related;
pub mod site;
pub mod slug;
pub mod tag;
pub mod tag_links;

pub use article::{ArticleDetail, ArticleService, ArticleServiceError};
pub use markdown::{MarkdownRenderer, RenderedMarkdown, TocEntry};
pub use related::{rank_related, RelatedArticle};
pub use site::{SiteService, StaticParams, TagPageParam};
pub use slug::{pinyin_slug, HeadingSlugger, SlugError};
pub use tag::{TagService, TagServiceError};
pub use tag_links::inject_tag_links;

//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod article;
pub mod tag;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use tag::{SqlxTagRepository, TagRepository};

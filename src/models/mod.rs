//! Data models
//!
//! This module contains the data structures shared by the repository,
//! service and API layers:
//! - Database entities (Article, Tag)
//! - Pagination types
//! - Input types used to seed the content projection

mod article;
mod tag;

pub use article::{
    Article, CreateArticleInput, FeaturedImage, ListParams, PagedResult, MAX_PAGE_SIZE,
};
pub use tag::{Tag, TagWithCount};

pub(crate) use article::page_count;

//! Database layer
//!
//! SQLite storage for the read-only content projection (articles, tags and
//! their many-to-many relation).
//!
//! # Usage
//!
//! ```ignore
//! use inkstone::config::DatabaseConfig;
//! use inkstone::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};

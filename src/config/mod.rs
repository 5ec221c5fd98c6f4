//! Configuration management
//!
//! This module handles loading and parsing configuration for Inkstone.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::MAX_PAGE_SIZE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Public site configuration
    #[serde(default)]
    pub site: SiteConfig,
    /// Related-article ranking configuration
    #[serde(default)]
    pub related: RelatedConfig,
    /// Backup daemon configuration
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the static front end)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1337
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "database/data.db".to_string()
}

/// Sort order for public article listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArticleSort {
    /// Newest publication first (default)
    #[default]
    #[serde(rename = "published_at:desc")]
    PublishedDesc,
    /// Oldest publication first
    #[serde(rename = "published_at:asc")]
    PublishedAsc,
    /// Newest creation first
    #[serde(rename = "created_at:desc")]
    CreatedDesc,
}

impl ArticleSort {
    /// SQL `ORDER BY` clause for this sort, qualified with the `a` table alias
    pub fn order_by(&self) -> &'static str {
        match self {
            ArticleSort::PublishedDesc => "a.published_at DESC, a.id DESC",
            ArticleSort::PublishedAsc => "a.published_at ASC, a.id ASC",
            ArticleSort::CreatedDesc => "a.created_at DESC, a.id DESC",
        }
    }
}

impl FromStr for ArticleSort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "published_at:desc" | "publishedat:desc" => Ok(ArticleSort::PublishedDesc),
            "published_at:asc" | "publishedat:asc" => Ok(ArticleSort::PublishedAsc),
            "created_at:desc" | "createdat:desc" => Ok(ArticleSort::CreatedDesc),
            other => Err(ConfigError::ValidationError(format!(
                "unknown article sort '{}'",
                other
            ))),
        }
    }
}

/// Public site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public base URL of the front end, used for sitemap and robots.txt
    #[serde(default = "default_site_url")]
    pub url: String,
    /// Articles per listing page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Sort order for listings
    #[serde(default)]
    pub sort: ArticleSort,
    /// Heading levels included in the table of contents
    #[serde(default = "default_toc_levels")]
    pub toc_levels: Vec<u8>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            page_size: default_page_size(),
            sort: ArticleSort::default(),
            toc_levels: default_toc_levels(),
        }
    }
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_page_size() -> u32 {
    12
}

fn default_toc_levels() -> Vec<u8> {
    vec![2, 3, 4]
}

/// Related-article ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedConfig {
    /// Maximum candidates gathered by the aggregate query
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: u32,
    /// Number of related articles shown under an article
    #[serde(default = "default_display_limit")]
    pub display_limit: u32,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            candidate_cap: default_candidate_cap(),
            display_limit: default_display_limit(),
        }
    }
}

fn default_candidate_cap() -> u32 {
    100
}

fn default_display_limit() -> u32 {
    4
}

/// Backup daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Database file to watch
    #[serde(default = "default_backup_source")]
    pub source_file: PathBuf,
    /// Directory receiving dated copies
    #[serde(default = "default_backup_target")]
    pub target_dir: PathBuf,
    /// Number of daily copies to keep
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            source_file: default_backup_source(),
            target_dir: default_backup_target(),
            retention_days: default_retention_days(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_backup_source() -> PathBuf {
    PathBuf::from("database/data.db")
}

fn default_backup_target() -> PathBuf {
    PathBuf::from("backups")
}

fn default_retention_days() -> u32 {
    2
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `INKSTONE_<SECTION>_<KEY>`;
    /// the backup section also honours the `BACKUP_*` names used by the
    /// standalone backup script.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.site.page_size) {
            return Err(ConfigError::ValidationError(format!(
                "site.page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.related.candidate_cap == 0 {
            return Err(ConfigError::ValidationError(
                "related.candidate_cap must be at least 1".to_string(),
            ));
        }
        if let Some(level) = self.site.toc_levels.iter().find(|l| !(1..=6).contains(*l)) {
            return Err(ConfigError::ValidationError(format!(
                "site.toc_levels contains invalid heading level {}",
                level
            )));
        }
        if self.backup.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "backup.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("INKSTONE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("INKSTONE_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("INKSTONE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("INKSTONE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(url) = std::env::var("INKSTONE_SITE_URL") {
            self.site.url = url;
        }
        if let Some(page_size) = env_parse::<u32>("INKSTONE_SITE_PAGE_SIZE")
            .filter(|n| (1..=MAX_PAGE_SIZE).contains(n)) {
            self.site.page_size = page_size;
        }
        if let Some(sort) = env_parse::<ArticleSort>("INKSTONE_SITE_SORT") {
            self.site.sort = sort;
        }

        if let Some(cap) = env_parse::<u32>("INKSTONE_RELATED_CANDIDATE_CAP").filter(|n| *n > 0) {
            self.related.candidate_cap = cap;
        }
        if let Some(limit) = env_parse::<u32>("INKSTONE_RELATED_DISPLAY_LIMIT") {
            self.related.display_limit = limit;
        }

        if let Ok(source) = std::env::var("BACKUP_SOURCE_FILE") {
            self.backup.source_file = PathBuf::from(source);
        }
        if let Ok(target) = std::env::var("BACKUP_TARGET_DIR") {
            self.backup.target_dir = PathBuf::from(target);
        }
        if let Some(days) = env_parse::<u32>("BACKUP_RETENTION_DAYS") {
            self.backup.retention_days = days;
        }
        if let Some(interval) = env_parse::<u64>("BACKUP_POLL_INTERVAL").filter(|n| *n > 0) {
            self.backup.poll_interval_ms = interval;
        }
    }
}

/// Read and parse an environment variable, ignoring unparsable values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "INKSTONE_SERVER_HOST",
    "INKSTONE_SERVER_PORT",
    "INKSTONE_SERVER_CORS_ORIGIN",
    "INKSTONE_DATABASE_URL",
    "INKSTONE_SITE_URL",
    "INKSTONE_SITE_PAGE_SIZE",
    "INKSTONE_SITE_SORT",
    "INKSTONE_RELATED_CANDIDATE_CAP",
    "INKSTONE_RELATED_DISPLAY_LIMIT",
    "BACKUP_SOURCE_FILE",
    "BACKUP_TARGET_DIR",
    "BACKUP_RETENTION_DAYS",
    "BACKUP_POLL_INTERVAL",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 1337);
        assert_eq!(config.database.url, "database/data.db");
        assert_eq!(config.site.page_size, 12);
        assert_eq!(config.site.sort, ArticleSort::PublishedDesc);
        assert_eq!(config.site.toc_levels, vec![2, 3, 4]);
        assert_eq!(config.related.candidate_cap, 100);
        assert_eq!(config.related.display_limit, 4);
        assert_eq!(config.backup.retention_days, 2);
        assert_eq!(config.backup.poll_interval_ms, 30_000);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 1337);
        assert_eq!(config.site.page_size, 12);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "site:\n  page_size: 20\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.site.page_size, 20);
        assert_eq!(config.site.url, "http://localhost:3000");
        assert_eq!(config.related.display_limit, 4);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://blog.example.com"
database:
  url: "/var/lib/blog/data.db"
site:
  url: "https://blog.example.com"
  page_size: 8
  sort: "created_at:desc"
  toc_levels: [2, 3]
related:
  candidate_cap: 50
  display_limit: 6
backup:
  source_file: "/var/lib/blog/data.db"
  target_dir: "/mnt/backups"
  retention_days: 7
  poll_interval_ms: 1000
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origin, "https://blog.example.com");
        assert_eq!(config.database.url, "/var/lib/blog/data.db");
        assert_eq!(config.site.url, "https://blog.example.com");
        assert_eq!(config.site.page_size, 8);
        assert_eq!(config.site.sort, ArticleSort::CreatedDesc);
        assert_eq!(config.site.toc_levels, vec![2, 3]);
        assert_eq!(config.related.candidate_cap, 50);
        assert_eq!(config.related.display_limit, 6);
        assert_eq!(config.backup.source_file, PathBuf::from("/var/lib/blog/data.db"));
        assert_eq!(config.backup.target_dir, PathBuf::from("/mnt/backups"));
        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.backup.poll_interval_ms, 1000);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_zero_page_size_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "site:\n  page_size: 0\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_load_oversized_page_size_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "site:\n  page_size: 150\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("page_size"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "site:\n  page_size: 100\n").unwrap();
        assert_eq!(Config::load(file.path()).unwrap().site.page_size, 100);
    }

    #[test]
    fn test_load_invalid_toc_level_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "site:\n  toc_levels: [2, 9]\n").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_article_sort_from_str() {
        assert_eq!(
            "publishedAt:DESC".parse::<ArticleSort>().unwrap(),
            ArticleSort::PublishedDesc
        );
        assert_eq!(
            "published_at:asc".parse::<ArticleSort>().unwrap(),
            ArticleSort::PublishedAsc
        );
        assert!("title:desc".parse::<ArticleSort>().is_err());
    }

    #[test]
    fn test_env_override_server_and_site() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("INKSTONE_SERVER_HOST", "192.168.1.1");
        std::env::set_var("INKSTONE_SERVER_PORT", "4000");
        std::env::set_var("INKSTONE_SITE_URL", "https://example.org");
        std::env::set_var("INKSTONE_SITE_SORT", "published_at:asc");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.site.url, "https://example.org");
        assert_eq!(config.site.sort, ArticleSort::PublishedAsc);

        clear_env();
    }

    #[test]
    fn test_env_override_backup_script_names() {
        let _guard = lock_env();
        clear_env();

        let file = NamedTempFile::new().unwrap();

        std::env::set_var("BACKUP_SOURCE_FILE", "/data/strapi.db");
        std::env::set_var("BACKUP_TARGET_DIR", "/backups");
        std::env::set_var("BACKUP_RETENTION_DAYS", "5");
        std::env::set_var("BACKUP_POLL_INTERVAL", "1500");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.backup.source_file, PathBuf::from("/data/strapi.db"));
        assert_eq!(config.backup.target_dir, PathBuf::from("/backups"));
        assert_eq!(config.backup.retention_days, 5);
        assert_eq!(config.backup.poll_interval_ms, 1500);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("INKSTONE_SERVER_PORT", "not_a_number");
        std::env::set_var("INKSTONE_SITE_PAGE_SIZE", "0");
        std::env::set_var("INKSTONE_SITE_SORT", "random");
        std::env::set_var("BACKUP_POLL_INTERVAL", "-5");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.page_size, 12);
        assert_eq!(config.site.sort, ArticleSort::PublishedDesc);
        assert_eq!(config.backup.poll_interval_ms, 30_000);

        clear_env();
    }
}

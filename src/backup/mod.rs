//! Database backup daemon
//!
//! Polls the SQLite file and keeps one dated copy per day in the target
//! directory:
//!
//! - a backup is taken on start, whenever the file's mtime moves forward,
//!   and on the first poll of a new local day
//! - copies are named `{stem}-{YYYY-MM-DD}{.ext}` and overwritten within a day
//! - after each backup, copies `retention_days` or more days old are removed
//!
//! The copy is a plain file copy, so it never holds a lock on the source.

use chrono::{Local, NaiveDate};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;

use crate::config::BackupConfig;

/// Error type for backup operations
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Source path has no file name: {0}")]
    InvalidSource(PathBuf),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl BackupError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File name pieces of the watched database
#[derive(Debug, Clone)]
struct BackupName {
    stem: String,
    ext: String,
}

impl BackupName {
    fn from_source(source: &Path) -> Result<Self, BackupError> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackupError::InvalidSource(source.to_path_buf()))?;
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        Ok(Self {
            stem: stem.to_string(),
            ext,
        })
    }

    fn file_name(&self, date: NaiveDate) -> String {
        format!("{}-{}{}", self.stem, date.format("%Y-%m-%d"), self.ext)
    }

    /// Date encoded in a backup file name, if the name is one of ours
    fn parse_date(&self, file_name: &str) -> Option<NaiveDate> {
        let date = file_name
            .strip_prefix(&self.stem)?
            .strip_prefix('-')?
            .strip_suffix(self.ext.as_str())?;
        if date.len() != 10 {
            return None;
        }
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

/// Backup file name for `source` on `date`
pub fn backup_file_name(source: &Path, date: NaiveDate) -> Result<String, BackupError> {
    Ok(BackupName::from_source(source)?.file_name(date))
}

/// What the poll loop remembers between ticks
#[derive(Debug, Default, Clone, Copy)]
struct PollState {
    last_mtime: Option<SystemTime>,
    last_date: Option<NaiveDate>,
}

/// Why a poll decided to back up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Startup,
    Modified,
    NewDay,
}

impl PollState {
    fn trigger(&self, mtime: SystemTime, today: NaiveDate) -> Option<Trigger> {
        match (self.last_mtime, self.last_date) {
            (None, None) => Some(Trigger::Startup),
            (Some(last), _) if mtime > last => Some(Trigger::Modified),
            (_, last_date) if last_date != Some(today) => Some(Trigger::NewDay),
            _ => None,
        }
    }
}

/// Polling backup daemon
pub struct BackupDaemon {
    config: BackupConfig,
    name: BackupName,
}

impl BackupDaemon {
    pub fn new(config: BackupConfig) -> Result<Self, BackupError> {
        let name = BackupName::from_source(&config.source_file)?;
        Ok(Self { config, name })
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Copy the source into today's backup file
    pub async fn backup_once(&self, today: NaiveDate) -> Result<PathBuf, BackupError> {
        let source = &self.config.source_file;
        if !tokio::fs::try_exists(source)
            .await
            .map_err(|e| BackupError::io(source, e))?
        {
            return Err(BackupError::SourceMissing(source.clone()));
        }

        let target_dir = &self.config.target_dir;
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| BackupError::io(target_dir, e))?;

        let target = target_dir.join(self.name.file_name(today));
        let bytes = tokio::fs::copy(source, &target)
            .await
            .map_err(|e| BackupError::io(&target, e))?;

        tracing::info!(
            "Backed up {} -> {} ({:.2} KB)",
            source.display(),
            target.display(),
            bytes as f64 / 1024.0
        );
        Ok(target)
    }

    /// Remove backups `retention_days` or more days older than `today`.
    ///
    /// A retention of 0 is treated as 1 so today's copy survives.
    pub async fn prune(&self, today: NaiveDate) -> Result<Vec<PathBuf>, BackupError> {
        let target_dir = &self.config.target_dir;
        let mut entries = match tokio::fs::read_dir(target_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(target_dir, e)),
        };

        let retention = i64::from(self.config.retention_days.max(1));
        let mut removed = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(target_dir, e))?
        {
            let file_name = entry.file_name();
            let Some(date) = file_name.to_str().and_then(|n| self.name.parse_date(n)) else {
                continue;
            };
            if (today - date).num_days() < retention {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!("Removed expired backup {}", path.display());
                    removed.push(path);
                }
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        if !removed.is_empty() {
            tracing::info!("Pruned {} expired backup(s)", removed.len());
        }
        Ok(removed)
    }

    /// One poll: back up and prune if the file changed or the day rolled over
    async fn poll(&self, state: &mut PollState, today: NaiveDate) -> Result<bool, BackupError> {
        let source = &self.config.source_file;
        let mtime = match tokio::fs::metadata(source).await {
            Ok(meta) => meta.modified().map_err(|e| BackupError::io(source, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Source file {} not found, skipping", source.display());
                return Ok(false);
            }
            Err(e) => return Err(BackupError::io(source, e)),
        };

        let Some(trigger) = state.trigger(mtime, today) else {
            tracing::trace!("No change in {}", source.display());
            return Ok(false);
        };
        tracing::debug!(?trigger, "Backup triggered");

        self.backup_once(today).await?;
        self.prune(today).await?;

        state.last_mtime = Some(mtime);
        state.last_date = Some(today);
        Ok(true)
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Failed polls are logged and retried on the next tick.
    pub async fn run<F>(self, shutdown: F) -> Result<(), BackupError>
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            source = %self.config.source_file.display(),
            target = %self.config.target_dir.display(),
            retention_days = self.config.retention_days,
            poll_interval_ms = self.config.poll_interval_ms,
            "Backup daemon started"
        );

        let mut state = PollState::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Backup daemon stopping");
                    return Ok(());
                }
                _ = interval.tick() => {
                    let today = Local::now().date_naive();
                    if let Err(e) = self.poll(&mut state, today).await {
                        tracing::error!("Backup failed: {}", e);
                    }
                }
            }
        }
    }
}

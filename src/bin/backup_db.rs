//! Database backup daemon
//!
//! Watches the SQLite file named by the `backup` config section (or the
//! `BACKUP_*` environment variables) and keeps dated daily copies.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkstone::{backup::BackupDaemon, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkstone=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let daemon = BackupDaemon::new(config.backup)?;

    daemon.run(inkstone::shutdown_signal()).await?;

    tracing::info!("Backup daemon stopped");
    Ok(())
}

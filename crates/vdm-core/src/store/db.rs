//! SQLite connection handling and schema. Job and history queries live in
//! `jobs` and `history`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

use crate::config::VdmConfig;

/// Handle to the SQLite-backed store. Cheap to clone.
#[derive(Clone)]
pub struct JobStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl JobStore {
    /// Open (or create) the database named by the config and run migrations.
    pub async fn open(cfg: &VdmConfig) -> Result<Self> {
        let path = cfg.resolved_database_path()?;
        Self::open_at(&path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create database dir {}", parent.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .with_context(|| format!("open database {}", path.display()))?;
        let store = JobStore { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "job store opened");
        Ok(store)
    }

    /// In-memory database (single connection so every query sees the same data).
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = JobStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // Timestamps are Unix milliseconds. `downloads` rows are written once at
        // completion and never updated.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS download_jobs (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                format_id INTEGER NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                file_path TEXT,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                thumbnail TEXT NOT NULL DEFAULT '',
                quality TEXT NOT NULL DEFAULT '',
                format TEXT NOT NULL,
                size TEXT NOT NULL DEFAULT '',
                file_path TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                download_job_id TEXT REFERENCES download_jobs(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS downloads_created_at ON downloads (created_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as Unix milliseconds (for DB timestamps).
pub(crate) fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_unix_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

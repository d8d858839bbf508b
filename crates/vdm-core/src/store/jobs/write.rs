//! Job write operations: create, progress, terminal transitions, recovery.
//!
//! Every terminal write is guarded by `status IN ('pending', 'downloading')`,
//! so at most one terminal state is ever stored for a job.

use anyhow::Result;
use std::path::Path;

use super::super::db::{unix_millis, JobStore};
use super::super::types::NewDownload;
use crate::job::{JobId, JobStatus};

/// Message stored on jobs that were live when the service went down.
pub const INTERRUPTED_MESSAGE: &str = "interrupted by service restart";

impl JobStore {
    /// Insert a new `pending` job row.
    pub async fn create_job(&self, id: JobId, video_id: &str, format_id: u32) -> Result<()> {
        let now = unix_millis();
        sqlx::query(
            r#"
            INSERT INTO download_jobs (
                id, video_id, format_id, progress, status,
                file_path, error, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, ?4, NULL, NULL, ?5, ?6)
            "#,
        )
        .bind(id.to_string())
        .bind(video_id)
        .bind(i64::from(format_id))
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist observed progress. Never lowers the stored value; the first call
    /// moves a `pending` row to `downloading`. Terminal rows are left alone.
    pub async fn record_progress(&self, id: JobId, percent: u8) -> Result<()> {
        let now = unix_millis();
        sqlx::query(
            r#"
            UPDATE download_jobs
            SET progress = MAX(progress, ?1),
                status = 'downloading',
                updated_at = ?2
            WHERE id = ?3
              AND status IN ('pending', 'downloading')
            "#,
        )
        .bind(i64::from(percent.min(100)))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move a live row to `error` or `cancelled`, raising progress to the last
    /// value shown to clients. Returns false if the row was missing or already
    /// terminal.
    pub async fn finish_job(
        &self,
        id: JobId,
        status: JobStatus,
        progress: u8,
        error: Option<&str>,
    ) -> Result<bool> {
        anyhow::ensure!(
            matches!(status, JobStatus::Error | JobStatus::Cancelled),
            "finish_job cannot store status {status}; use complete_with_history"
        );
        let now = unix_millis();
        let r = sqlx::query(
            r#"
            UPDATE download_jobs
            SET status = ?1,
                progress = MAX(progress, ?2),
                error = ?3,
                updated_at = ?4
            WHERE id = ?5
              AND status IN ('pending', 'downloading')
            "#,
        )
        .bind(status.as_str())
        .bind(i64::from(progress.min(100)))
        .bind(error)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Mark a job complete and write its history row in one transaction.
    ///
    /// Returns the history row id, or None (and writes nothing) if the job was
    /// missing or already terminal.
    pub async fn complete_with_history(
        &self,
        id: JobId,
        download: &NewDownload,
    ) -> Result<Option<i64>> {
        let now = unix_millis();
        let file_path = path_text(&download.file_path);
        let mut tx = self.pool.begin().await?;

        let r = sqlx::query(
            r#"
            UPDATE download_jobs
            SET status = 'complete',
                progress = 100,
                file_path = ?1,
                error = NULL,
                updated_at = ?2
            WHERE id = ?3
              AND status IN ('pending', 'downloading')
            "#,
        )
        .bind(&file_path)
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        if r.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row_id = sqlx::query(
            r#"
            INSERT INTO downloads (
                video_id, title, author, thumbnail, quality, format, size,
                file_path, created_at, download_job_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&download.video_id)
        .bind(&download.title)
        .bind(&download.author)
        .bind(&download.thumbnail)
        .bind(&download.quality)
        .bind(&download.format)
        .bind(&download.size)
        .bind(&file_path)
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(Some(row_id))
    }

    /// Mark every `pending`/`downloading` row as `error` (no process survives a
    /// restart). Returns the number of rows changed.
    pub async fn recover_interrupted_jobs(&self) -> Result<u64> {
        let now = unix_millis();
        let r = sqlx::query(
            r#"
            UPDATE download_jobs
            SET status = 'error',
                error = ?1,
                updated_at = ?2
            WHERE status IN ('pending', 'downloading')
            "#,
        )
        .bind(INTERRUPTED_MESSAGE)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

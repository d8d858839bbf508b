//! Job read operations.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;
use uuid::Uuid;

use super::super::db::{from_unix_millis, JobStore};
use super::super::types::JobRecord;
use crate::job::{JobId, JobStatus};

fn job_from_row(row: &SqliteRow) -> Result<JobRecord> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).with_context(|| format!("malformed job id {id:?}"))?;
    let format_id: i64 = row.try_get("format_id")?;
    let progress: i64 = row.try_get("progress")?;
    let status: String = row.try_get("status")?;
    let file_path: Option<String> = row.try_get("file_path")?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(JobRecord {
        id,
        video_id: row.try_get("video_id")?,
        format_id: u32::try_from(format_id).unwrap_or_default(),
        progress: progress.clamp(0, 100) as u8,
        status: JobStatus::from_str(&status),
        file_path: file_path.map(PathBuf::from),
        error: row.try_get("error")?,
        created_at: from_unix_millis(created_at),
        updated_at: from_unix_millis(updated_at),
    })
}

impl JobStore {
    /// Fetch one job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, video_id, format_id, progress, status, file_path, error,
                   created_at, updated_at
            FROM download_jobs
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    /// All job rows, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, video_id, format_id, progress, status, file_path, error,
                   created_at, updated_at
            FROM download_jobs
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }
}
